//! Archive fixtures and a mock download server

#![allow(dead_code)]

use camino::Utf8PathBuf;
use contrib_core::types::NetworkConfig;
use contrib_lifecycle::ArchivePipeline;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a `.tar.gz` holding `files` as (path, contents) pairs
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .expect("append archive entry");
    }

    builder
        .into_inner()
        .expect("finish tar stream")
        .finish()
        .expect("finish gzip stream")
}

/// Typical library layout wrapped in one top-level folder
pub fn sound_archive(version: &str) -> Vec<u8> {
    tar_gz(&[
        ("sound/library/sound.jar", "jar bytes"),
        ("sound/library.properties", &format!("version={}\n", version)),
    ])
}

/// Serve `body` at `route`
pub async fn serve_archive(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serve `body` at `route` after `delay`
pub async fn serve_slowly(server: &MockServer, route: &str, body: Vec<u8>, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body).set_delay(delay))
        .mount(server)
        .await;
}

/// Archive pipeline rooted at `root` with short timeouts
pub fn archive_pipeline(root: &Path) -> ArchivePipeline {
    let root = Utf8PathBuf::from_path_buf(root.to_path_buf()).expect("utf-8 temp path");
    let network = NetworkConfig {
        http_timeout_secs: 5,
        download_timeout_secs: 30,
        ..NetworkConfig::default()
    };
    ArchivePipeline::new(root, &network).expect("build pipeline")
}
