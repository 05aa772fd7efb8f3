/// Name given to uploads whose filename is blank.
pub const UNNAMED_FILE: &str = "unnamed_file";

/// Sanitize an uploaded filename into the form documents are stored under.
///
/// The name is trimmed and lower-cased, any directory components are dropped,
/// and each run of characters outside `[a-z0-9_]` in the stem collapses into a
/// single `_`. The extension is kept as-is. The result is stable under repeated
/// normalization.
pub fn normalize_filename(file_name: &str) -> String {
    let lowered = file_name.trim().to_lowercase();
    let base = lowered
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if base.is_empty() {
        return UNNAMED_FILE.to_string();
    }

    let (stem, extension) = split_extension(base);

    let mut safe = String::with_capacity(stem.len());
    let mut in_unsafe_run = false;
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            safe.push(ch);
            in_unsafe_run = false;
        } else if !in_unsafe_run {
            safe.push('_');
            in_unsafe_run = true;
        }
    }

    format!("{safe}{extension}")
}

/// Split at the last dot. A leading dot or a trailing dot does not start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 && i < name.len() - 1 => name.split_at(i),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_untouched() {
        assert_eq!(normalize_filename("report.pdf"), "report.pdf");
    }

    #[test]
    fn test_lowercases_and_replaces_unsafe_runs() {
        assert_eq!(normalize_filename("  My Report (v2).PDF "), "my_report_v2_.pdf");
        assert_eq!(normalize_filename("a--b.txt"), "a_b.txt");
        assert_eq!(normalize_filename("résumé.docx"), "r_sum_.docx");
    }

    #[test]
    fn test_only_last_extension_is_kept() {
        assert_eq!(normalize_filename("archive.tar.gz"), "archive_tar.gz");
    }

    #[test]
    fn test_blank_names() {
        assert_eq!(normalize_filename(""), UNNAMED_FILE);
        assert_eq!(normalize_filename("   \t"), UNNAMED_FILE);
        assert_eq!(normalize_filename("/"), UNNAMED_FILE);
    }

    #[test]
    fn test_dot_edge_cases() {
        assert_eq!(normalize_filename(".env"), "_env");
        assert_eq!(normalize_filename("notes."), "notes_");
        assert_eq!(normalize_filename(".."), "_");
    }

    #[test]
    fn test_directory_components_dropped() {
        assert_eq!(normalize_filename("../../etc/passwd"), "passwd");
        assert_eq!(normalize_filename("docs/Q1 Plan.md"), "q1_plan.md");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Quarterly Report.PDF",
            "  spaced  out  .txt",
            "a.b.c",
            ".hidden",
            "x.",
            "weird ext.t x",
            "",
            "ÜBER.png",
            "dir/ file.txt",
        ];
        for sample in samples {
            let once = normalize_filename(sample);
            assert_eq!(normalize_filename(&once), once, "input: {sample:?}");
        }
    }
}
