use session::model::LookupJob;

/// Names to search under, in order: localized first, then canonical.
///
/// Blanks are skipped and a name equal (ignoring case) to an earlier one is
/// not tried twice. With no usable name the commodity key is the only try.
pub fn name_candidates(job: &LookupJob) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(2);

    for name in [&job.localized_name, &job.canonical_name] {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if out.iter().any(|seen| seen.to_lowercase() == name.to_lowercase()) {
            continue;
        }
        out.push(name.to_string());
    }

    if out.is_empty() {
        out.push(job.commodity_key.clone());
    }
    out
}
