const MAX_ERROR_MESSAGE_LEN: usize = 256;

pub(crate) fn truncate_message(body: &str) -> String {
    let compact = body.trim().replace('\n', " ");
    compact.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

pub(crate) fn non_empty_owned(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Joins text fragments and drops the result when it is blank.
pub(crate) fn join_text_parts<'a, I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = parts.into_iter().collect::<String>();
    non_empty_owned(&joined)
}

pub(crate) fn build_versioned_url(api_base_url: &str, version: &str, endpoint_path: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let endpoint_path = endpoint_path.trim_start_matches('/');
    let version_segment = format!("/{version}");

    if base.ends_with(&version_segment) {
        format!("{base}/{endpoint_path}")
    } else {
        format!("{base}/{version}/{endpoint_path}")
    }
}
