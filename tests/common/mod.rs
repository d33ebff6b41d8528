#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

/// Version directory of the sample maven release
pub const WIDGET_DIR: &str = "org/acme/widget/1.0";

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, body) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap();
}

fn append_entries<W: Write>(builder: &mut tar::Builder<W>, entries: &[(&str, &[u8])]) {
    for (name, body) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *body).unwrap();
    }
}

pub fn write_tar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut builder = tar::Builder::new(File::create(path).unwrap());
    append_entries(&mut builder, entries);
    builder.into_inner().unwrap().flush().unwrap();
}

pub fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
    let encoder = flate2::write::GzEncoder::new(
        File::create(path).unwrap(),
        flate2::Compression::default(),
    );
    let mut builder = tar::Builder::new(encoder);
    append_entries(&mut builder, entries);
    builder.into_inner().unwrap().finish().unwrap();
}

/// Repository-relative paths of the sample maven release, sorted
pub fn widget_paths() -> Vec<String> {
    vec![
        format!("{}/widget-1.0.jar", WIDGET_DIR),
        format!("{}/widget-1.0.pom", WIDGET_DIR),
    ]
}

/// A maven release zip: jar, pom and the shared metadata file
pub fn widget_zip(dir: &Path) -> PathBuf {
    let path = dir.join("widget-1.0-maven-repository.zip");
    let jar = format!("maven-repository/{}/widget-1.0.jar", WIDGET_DIR);
    let pom = format!("maven-repository/{}/widget-1.0.pom", WIDGET_DIR);
    write_zip(
        &path,
        &[
            (jar.as_str(), b"jar bytes".as_slice()),
            (pom.as_str(), b"<project/>".as_slice()),
            (
                "maven-repository/org/acme/widget/maven-metadata.xml",
                b"<metadata/>".as_slice(),
            ),
        ],
    );
    path
}

/// An npm tarball the way `npm pack` lays it out
pub fn npm_tarball(dir: &Path, name: &str, version: &str) -> PathBuf {
    let path = dir.join(format!("{}-{}.tgz", name.replace('/', "-"), version));
    let manifest = format!(r#"{{"name":"{}","version":"{}"}}"#, name, version);
    write_tar_gz(
        &path,
        &[
            ("package/package.json", manifest.as_bytes()),
            ("package/index.js", b"module.exports = 1;".as_slice()),
        ],
    );
    path
}
