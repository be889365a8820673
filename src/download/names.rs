// src/download/names.rs
//
// Pure derivation of folder and file names from filing metadata and URLs.
// The URL parsing is heuristic (ProPublica object-store paths), so all the
// string surgery lives here behind tested functions.

/// Sentinel the API uses when it does not know the form type.
pub const UNKNOWN_FORM_TYPE: &str = "Unknown";

/// Cap on how much of the raw institution name feeds into a folder name.
const NAME_PREFIX_LEN: usize = 30;

/// Resolve the form-type label for a filing. When the explicit label is
/// absent or the `Unknown` sentinel, infer it from the URL; `_990_` is
/// checked before the EZ/PF variants, matching filename conventions like
/// `..._990_2012.pdf`. Slashes are flattened so the label is path-safe.
pub fn form_type_for(label: Option<&str>, url: &str) -> String {
    let label = label.unwrap_or(UNKNOWN_FORM_TYPE);
    let resolved = if label == UNKNOWN_FORM_TYPE {
        if url.contains("_990_") {
            "990"
        } else if url.contains("_990EZ_") {
            "990EZ"
        } else if url.contains("_990PF_") {
            "990PF"
        } else {
            label
        }
    } else {
        label
    };
    resolved.replace('/', "_")
}

/// `{year}_Form{form_type}[_{filing_id}].pdf`; the filing id keeps amended
/// returns from clobbering each other.
pub fn filing_filename(year: i32, form_type: &str, filing_id: Option<i64>) -> String {
    match filing_id {
        Some(id) => format!("{}_Form{}_{}.pdf", year, form_type, id),
        None => format!("{}_Form{}.pdf", year, form_type),
    }
}

/// Last path segment of a URL with any query string stripped and `.pdf`
/// appended when missing. Degenerate tails (trailing slash, bare host,
/// empty string) fall back to `document.pdf`.
pub fn file_token_from_url(url: &str) -> String {
    let tail = url
        .rsplit('/')
        .next()
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("");
    if tail.is_empty() {
        return "document.pdf".to_string();
    }
    if tail.ends_with(".pdf") {
        tail.to_string()
    } else {
        format!("{}.pdf", tail)
    }
}

/// `{Year}_{url tail}` filename for the bulk downloader.
pub fn bulk_filename(year: &str, url: &str) -> String {
    format!("{}_{}", year, file_token_from_url(url))
}

/// Keep only alphanumerics and underscores after mapping spaces and slashes
/// to underscores; applied to the truncated raw name.
fn sanitize_component(raw: &str) -> String {
    raw.replace(' ', "_")
        .replace('/', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// `{ein}_{sanitized institution name}` folder for one organization's PDFs.
pub fn org_folder(ein: &str, institution_name: &str) -> String {
    let name = if institution_name.is_empty() {
        "Unknown"
    } else {
        institution_name
    };
    let prefix: String = name.chars().take(NAME_PREFIX_LEN).collect();
    format!("{}_{}", ein, sanitize_component(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_label_wins_over_url() {
        assert_eq!(
            form_type_for(Some("990T"), "https://x/IRS990_990EZ_2012.pdf"),
            "990T"
        );
    }

    #[test]
    fn unknown_label_is_inferred_from_url() {
        assert_eq!(form_type_for(Some("Unknown"), "https://x/a_990_b.pdf"), "990");
        assert_eq!(form_type_for(None, "https://x/a_990EZ_b.pdf"), "990EZ");
        assert_eq!(form_type_for(None, "https://x/a_990PF_b.pdf"), "990PF");
        assert_eq!(form_type_for(None, "https://x/scan.pdf"), "Unknown");
    }

    #[test]
    fn slashes_in_labels_are_flattened() {
        assert_eq!(form_type_for(Some("990/990EZ"), ""), "990_990EZ");
    }

    #[test]
    fn filing_filename_includes_id_when_present() {
        assert_eq!(
            filing_filename(2012, "990", Some(201213456)),
            "2012_Form990_201213456.pdf"
        );
        assert_eq!(filing_filename(2012, "990", None), "2012_Form990.pdf");
    }

    #[test]
    fn url_tail_with_query_string() {
        assert_eq!(
            file_token_from_url("https://x/bucket/abc123.pdf?Expires=99"),
            "abc123.pdf"
        );
    }

    #[test]
    fn url_tail_without_extension_gets_pdf_appended() {
        assert_eq!(file_token_from_url("https://x/bucket/abc123"), "abc123.pdf");
    }

    #[test]
    fn degenerate_urls_fall_back() {
        assert_eq!(file_token_from_url("https://x/bucket/"), "document.pdf");
        assert_eq!(file_token_from_url(""), "document.pdf");
        assert_eq!(file_token_from_url("?only=query"), "document.pdf");
    }

    #[test]
    fn bulk_filename_prefixes_year() {
        assert_eq!(
            bulk_filename("2013", "https://x/abc.pdf?sig=1"),
            "2013_abc.pdf"
        );
    }

    #[test]
    fn org_folder_sanitizes_and_truncates() {
        assert_eq!(
            org_folder("010215213", "Trustees of Example College / Main Campus"),
            "010215213_Trustees_of_Example_College___"
        );
        assert_eq!(org_folder("1", "St. Mary's (Ohio)"), "1_St_Marys_Ohio");
        assert_eq!(org_folder("2", ""), "2_Unknown");
    }
}
