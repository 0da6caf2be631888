//! Landing page → direct PDF URL rewriting for known publishers.
//!
//! Supports:
//!   PMLR proceedings  https://proceedings.mlr.press/v119/wang20t.html
//!   arXiv             https://arxiv.org/abs/1706.01061
//!   CVF open access   https://openaccess.thecvf.com/content_cvpr_2016/html/Cheng_X_CVPR_2016_paper.html
//!
//! Anything else maps to `None` and the hit must be dropped.

const PMLR_HOST: &str = "proceedings.mlr.press";
const ARXIV_ABS: &str = "arxiv.org/abs/";
const CVF_HOST:  &str = "openaccess.thecvf.com";

/// Map a landing-page URL to its direct PDF URL.
pub fn pdf_url_for(landing_url: &str) -> Option<String> {
    let url = landing_url.trim();
    if url.contains(PMLR_HOST) {
        pmlr(url)
    } else if url.contains(ARXIV_ABS) {
        arxiv(url)
    } else if url.contains(CVF_HOST) {
        cvf(url)
    } else {
        None
    }
}

/// `.../<volume>/<id>.html` → `https://proceedings.mlr.press/<volume>/<id>/<id>.pdf`
fn pmlr(url: &str) -> Option<String> {
    let mut parts = url.trim_end_matches('/').rsplit('/');
    let id = parts.next()?.strip_suffix(".html")?;
    let volume = parts.next()?;
    if id.is_empty() || volume.is_empty() || volume.contains(PMLR_HOST) {
        return None;
    }
    Some(format!("https://{PMLR_HOST}/{volume}/{id}/{id}.pdf"))
}

/// `.../abs/<id>` → `.../pdf/<id>.pdf`
fn arxiv(url: &str) -> Option<String> {
    let url = url.trim_end_matches('/');
    let (_, id) = url.split_once(ARXIV_ABS)?;
    if id.is_empty() {
        return None;
    }
    let pdf = url.replacen("/abs/", "/pdf/", 1);
    Some(if pdf.ends_with(".pdf") { pdf } else { format!("{pdf}.pdf") })
}

/// `.../html/<name>.html` → `.../papers/<name>.pdf`
fn cvf(url: &str) -> Option<String> {
    let stem = url.strip_suffix(".html")?;
    if !stem.contains("/html/") {
        return None;
    }
    Some(format!("{}.pdf", stem.replacen("/html/", "/papers/", 1)))
}
