// src/test_support.rs

//! Fixtures shared by unit tests

use crate::release::{Release, ReleaseAsset};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A non-draft, non-prerelease release with the given asset URLs
pub fn release(tag: &str, asset_urls: &[&str]) -> Release {
    Release {
        tag: tag.to_string(),
        name: None,
        is_draft: false,
        is_prerelease: false,
        source_archive_url: Some(format!(
            "https://api.github.com/repos/octofarm/octofarm/tarball/{}",
            tag
        )),
        published_at: None,
        assets: asset_urls
            .iter()
            .map(|url| ReleaseAsset {
                name: url.rsplit('/').next().unwrap_or_default().to_string(),
                browser_download_url: url.to_string(),
                size: 0,
            })
            .collect(),
    }
}

/// Write a zip archive; entries with `None` content are directories
pub fn write_zip(path: &Path, entries: &[(&str, Option<&str>)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        match content {
            Some(content) => {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            None => {
                zip.add_directory(name.trim_end_matches('/'), options).unwrap();
            }
        }
    }
    zip.finish().unwrap();
}

/// Write a gzip tarball laid out like a GitHub source snapshot, including
/// the leading pax global header; entries with `None` content are directories
pub fn write_source_tarball(path: &Path, entries: &[(&str, Option<&str>)]) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let pax = b"18 comment=abcdef\n";
    let mut header = tar::Header::new_ustar();
    header.set_entry_type(tar::EntryType::XGlobalHeader);
    header.set_path("pax_global_header").unwrap();
    header.set_size(pax.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, &pax[..]).unwrap();

    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        match content {
            Some(content) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, name, content.as_bytes())
                    .unwrap();
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                builder
                    .append_data(&mut header, name, std::io::empty())
                    .unwrap();
            }
        }
    }

    builder.into_inner().unwrap().finish().unwrap();
}

/// Serve a single HTTP response on a loopback port and return its base URL
///
/// Without a `Content-Length` header the body is delimited by closing the
/// connection.
pub fn serve_once(status: &str, headers: &[(&str, &str)], body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let mut head = format!("HTTP/1.1 {}\r\n", status);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("Connection: close\r\n\r\n");

    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });

    format!("http://{}", addr)
}
