use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name suffix of every release manifest
pub const MANIFEST_SUFFIX: &str = ".txt";

/// `{product}-{version}.txt`
pub fn manifest_name(product_key: &str) -> String {
    format!("{}{}", product_key, MANIFEST_SUFFIX)
}

/// Make a path relative to `root`: strip `root` when it is a prefix, then
/// any leading separator.
pub fn normalize_path(path: &str, root: &str) -> String {
    let stripped = if !root.is_empty() && path.starts_with(root) {
        &path[root.len()..]
    } else {
        path
    };
    stripped.trim_start_matches('/').to_string()
}

/// Write the manifest for a release into directory `root`.
///
/// One normalized path per line, in the given order, replacing any earlier
/// file of the same name. Duplicates are written as given.
/// Returns the manifest file name and its full path.
pub fn write_manifest<S: AsRef<str>>(
    paths: &[S],
    root: &Path,
    product_key: &str,
) -> std::io::Result<(String, PathBuf)> {
    let name = manifest_name(product_key);
    let manifest_path = root.join(&name);
    let root_str = root.to_string_lossy();

    let mut writer = BufWriter::new(File::create(&manifest_path)?);
    for path in paths {
        writeln!(writer, "{}", normalize_path(path.as_ref(), &root_str))?;
    }
    writer.flush()?;

    Ok((name, manifest_path))
}

/// Parse manifest text back into its path sequence
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a manifest file written by [`write_manifest`]
pub fn read_manifest(manifest_path: &Path) -> std::io::Result<Vec<String>> {
    let text = std::fs::read_to_string(manifest_path)?;
    Ok(parse_manifest(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_name() {
        assert_eq!(manifest_name("eap-7.4.0"), "eap-7.4.0.txt");
    }

    #[test]
    fn test_normalize_strips_root_and_separator() {
        assert_eq!(
            normalize_path("/work/maven-repository/org/foo.jar", "/work/maven-repository"),
            "org/foo.jar"
        );
        assert_eq!(normalize_path("/org/foo.jar", "/elsewhere"), "org/foo.jar");
        assert_eq!(normalize_path("org/foo.jar", ""), "org/foo.jar");
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        assert_eq!(
            parse_manifest("a/b.jar\n\n  a/b.pom  \n"),
            vec!["a/b.jar", "a/b.pom"]
        );
    }
}
