//! Locating rating-list files: remote download, zip extraction and local
//! files.
//!
//! FIDE publishes each list as
//! `{category}_{mon}{yy}frl.zip` (fixed-width, before 2020) or
//! `{category}_{mon}{yy}frl_xml.zip` (XML, from 2020) under
//! `https://ratings.fide.com/download/`. An archive is extracted into a
//! directory named after it, which must then hold exactly one `.xml` or
//! `.txt` data file.
//!
//! Extraction happens in a staging directory next to the destination. Only a
//! complete extraction is renamed into place, and it carries an
//! [`EXTRACTED_MARKER`] file. A directory without the marker is never reused.

use std::{
  fs::File,
  future::Future,
  io,
  path::{Path, PathBuf},
  time::Duration,
};

use fide_core::{Category, Period};
use fide_lists::ListFormat;
use reqwest::{Client, StatusCode};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://ratings.fide.com/download/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Written last into a finished extraction directory.
pub const EXTRACTED_MARKER: &str = ".extracted";

/// The archive name FIDE uses for a list.
pub fn remote_file_name(period: Period, category: Category) -> String {
  let suffix = if period.year() >= 2020 { "_xml" } else { "" };
  format!(
    "{category}_{}{}frl{suffix}.zip",
    period.month_abbrev(),
    period.short_year()
  )
}

// ─── Data files ──────────────────────────────────────────────────────────────

/// An extracted (or locally supplied) rating-list file ready to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
  pub path:   PathBuf,
  pub format: ListFormat,
}

impl DataFile {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let format = ListFormat::from_path(&path);
    Self { path, format }
  }

  /// Use a file from disk. A `.zip` is extracted into
  /// `{extract_root}/{stem}/`; `.xml` and `.txt` files are used in place.
  pub async fn from_local(path: &Path, extract_root: &Path) -> Result<Self> {
    let metadata = tokio::fs::metadata(path)
      .await
      .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    if !metadata.is_file() {
      return Err(Error::UnsupportedFile(path.to_path_buf()));
    }

    let ext = path
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_ascii_lowercase);
    match ext.as_deref() {
      Some("xml" | "txt") => Ok(Self::new(path)),
      Some("zip") => {
        let stem = path
          .file_stem()
          .ok_or_else(|| Error::UnsupportedFile(path.to_path_buf()))?;
        let dest = extract_root.join(stem);
        unpack(path.to_path_buf(), dest).await
      }
      _ => Err(Error::UnsupportedFile(path.to_path_buf())),
    }
  }

  pub async fn read(&self) -> Result<Vec<u8>> {
    tokio::fs::read(&self.path)
      .await
      .map_err(|source| Error::Io { path: self.path.clone(), source })
  }
}

fn is_data_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e.eq_ignore_ascii_case("xml") || e.eq_ignore_ascii_case("txt"))
}

/// Find the single data file in `dir`.
fn locate_data_file(dir: &Path) -> Result<DataFile> {
  let io_err = |source| Error::Io { path: dir.to_path_buf(), source };

  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(io_err)? {
    let path = entry.map_err(io_err)?.path();
    if path.is_file() && is_data_file(&path) {
      files.push(path);
    }
  }
  files.sort();

  match files.len() {
    0 => Err(Error::NoDataFile(dir.to_path_buf())),
    1 => Ok(DataFile::new(files.remove(0))),
    _ => Err(Error::MultipleDataFiles { dir: dir.to_path_buf(), files }),
  }
}

/// Extract every file of `archive` into `dir`, flattening directories.
fn extract_entries(archive: &Path, dir: &Path) -> Result<()> {
  let corrupt = |source| Error::Archive { path: archive.to_path_buf(), source };

  let file = File::open(archive)
    .map_err(|source| Error::Io { path: archive.to_path_buf(), source })?;
  let mut zip = zip::ZipArchive::new(file).map_err(corrupt)?;

  for i in 0..zip.len() {
    let mut entry = zip.by_index(i).map_err(corrupt)?;
    if entry.is_dir() {
      continue;
    }
    // Entries with absolute or `..` paths are ignored.
    let Some(name) = entry
      .enclosed_name()
      .and_then(|p| p.file_name().map(PathBuf::from))
    else {
      tracing::warn!(entry = entry.name(), "skipping unsafe archive entry");
      continue;
    };

    let target = dir.join(name);
    let mut out = File::create(&target)
      .map_err(|source| Error::Io { path: target.clone(), source })?;
    io::copy(&mut entry, &mut out).map_err(|source| match source.kind() {
      io::ErrorKind::InvalidData => Error::Archive {
        path:   archive.to_path_buf(),
        source: zip::result::ZipError::Io(source),
      },
      _ => Error::Io { path: target.clone(), source },
    })?;
    out
      .sync_all()
      .map_err(|source| Error::Io { path: target.clone(), source })?;
    tracing::debug!(path = %target.display(), "extracted");
  }

  Ok(())
}

/// Extract `archive` into a staging directory beside `dest`, check it holds
/// exactly one data file, mark it complete and rename it to `dest`.
///
/// An interrupted extraction leaves only the staging directory behind, which
/// is removed on drop or ignored on the next attempt.
fn extract_zip(archive: &Path, dest: &Path) -> Result<DataFile> {
  let parent = dest.parent().unwrap_or(Path::new("."));
  let io_err = |path: &Path| {
    let path = path.to_path_buf();
    move |source: io::Error| Error::Io { path, source }
  };

  std::fs::create_dir_all(parent).map_err(io_err(parent))?;
  let staging = tempfile::Builder::new()
    .prefix(".extract-")
    .tempdir_in(parent)
    .map_err(io_err(parent))?;

  extract_entries(archive, staging.path())?;
  locate_data_file(staging.path())?;

  let marker = staging.path().join(EXTRACTED_MARKER);
  File::create(&marker).map_err(io_err(&marker))?;

  if dest.exists() {
    tracing::warn!(path = %dest.display(), "replacing incomplete extraction");
    std::fs::remove_dir_all(dest).map_err(io_err(dest))?;
  }
  std::fs::rename(staging.path(), dest).map_err(io_err(dest))?;
  // Renamed away; nothing left for the guard to clean up.
  let _ = staging.keep();

  locate_data_file(dest)
}

/// A finished extraction in `dest`, if an earlier attempt left one.
fn completed_extraction(dest: &Path) -> Option<DataFile> {
  if !dest.join(EXTRACTED_MARKER).is_file() {
    return None;
  }
  match locate_data_file(dest) {
    Ok(file) => Some(file),
    Err(e) => {
      tracing::warn!(error = %e, "ignoring unusable extraction");
      None
    }
  }
}

/// Extract `archive` into `dest` off the async runtime and locate its data
/// file.
async fn unpack(archive: PathBuf, dest: PathBuf) -> Result<DataFile> {
  tokio::task::spawn_blocking(move || extract_zip(&archive, &dest)).await?
}

// ─── Sources ─────────────────────────────────────────────────────────────────

/// The result of asking a source for a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  Ready(DataFile),
  /// Not published (404) or not reachable right now. Not an error: the list
  /// stays pending and is tried again later.
  Unavailable { url: String, reason: String },
}

/// Where rating lists come from.
pub trait ListSource: Send + Sync {
  fn fetch(
    &self,
    period: Period,
    category: Category,
  ) -> impl Future<Output = Result<FetchOutcome>> + Send + '_;
}

/// Downloads lists from FIDE over HTTP.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct Fetcher {
  client:       Client,
  base_url:     String,
  download_dir: PathBuf,
}

impl Fetcher {
  pub fn new(
    base_url: impl Into<String>,
    download_dir: impl Into<PathBuf>,
    timeout: Duration,
  ) -> Result<Self> {
    let base_url = base_url.into();
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|source| Error::Http { url: base_url.clone(), source })?;
    Ok(Self { client, base_url, download_dir: download_dir.into() })
  }

  pub fn download_dir(&self) -> &Path { &self.download_dir }

  fn url(&self, file_name: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
  }

  async fn download(&self, url: &str) -> Result<Download> {
    let unreachable = |e: &reqwest::Error| e.is_timeout() || e.is_connect();

    let resp = match self.client.get(url).send().await {
      Ok(resp) => resp,
      Err(e) if unreachable(&e) => return Ok(Download::Unavailable(e.to_string())),
      Err(source) => return Err(Error::Http { url: url.to_string(), source }),
    };

    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
      return Ok(Download::Unavailable(status.to_string()));
    }
    if !status.is_success() {
      return Err(Error::Status { url: url.to_string(), status });
    }

    match resp.bytes().await {
      Ok(bytes) => Ok(Download::Body(bytes.to_vec())),
      Err(e) if unreachable(&e) => Ok(Download::Unavailable(e.to_string())),
      Err(source) => Err(Error::Http { url: url.to_string(), source }),
    }
  }
}

enum Download {
  Body(Vec<u8>),
  Unavailable(String),
}

impl ListSource for Fetcher {
  async fn fetch(&self, period: Period, category: Category) -> Result<FetchOutcome> {
    let file_name = remote_file_name(period, category);
    let stem = file_name.trim_end_matches(".zip");
    let dest = self.download_dir.join(stem);

    let dir = dest.clone();
    if let Some(file) = tokio::task::spawn_blocking(move || completed_extraction(&dir)).await? {
      tracing::debug!(path = %file.path.display(), "reusing extracted list");
      return Ok(FetchOutcome::Ready(file));
    }

    let url = self.url(&file_name);
    tracing::info!(%url, "downloading rating list");
    let bytes = match self.download(&url).await? {
      Download::Body(bytes) => bytes,
      Download::Unavailable(reason) => {
        return Ok(FetchOutcome::Unavailable { url, reason });
      }
    };

    tokio::fs::create_dir_all(&self.download_dir)
      .await
      .map_err(|source| Error::Io { path: self.download_dir.clone(), source })?;
    let archive = self.download_dir.join(&file_name);
    tokio::fs::write(&archive, &bytes)
      .await
      .map_err(|source| Error::Io { path: archive.clone(), source })?;
    tracing::debug!(path = %archive.display(), bytes = bytes.len(), "downloaded");

    unpack(archive, dest).await.map(FetchOutcome::Ready)
  }
}

#[cfg(test)]
mod tests {
  use std::io::{Cursor, Write};

  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
  };
  use zip::write::SimpleFileOptions;

  use super::*;

  fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
      writer.start_file(*name, SimpleFileOptions::default()).unwrap();
      writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
  }

  fn period(s: &str) -> Period { s.parse().unwrap() }

  const XML: &str = "<playerslist><player><fideid>1</fideid></player></playerslist>";

  #[test]
  fn remote_names_follow_the_2020_switch() {
    assert_eq!(
      remote_file_name(period("20150601"), Category::Standard),
      "standard_jun15frl.zip"
    );
    assert_eq!(
      remote_file_name(period("20250801"), Category::Blitz),
      "blitz_aug25frl_xml.zip"
    );
    assert_eq!(
      remote_file_name(period("20200101"), Category::Rapid),
      "rapid_jan20frl_xml.zip"
    );
  }

  async fn serve(file: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path(format!("/{file}")))
      .respond_with(response)
      .mount(&server)
      .await;
    server
  }

  #[tokio::test]
  async fn downloads_and_extracts() {
    let dir = tempfile::tempdir().unwrap();
    let body = zip_of(&[("standard_aug25frl_xml.xml", XML)]);
    let server = serve(
      "standard_aug25frl_xml.zip",
      ResponseTemplate::new(200).set_body_bytes(body),
    )
    .await;

    let fetcher = Fetcher::new(server.uri(), dir.path(), DEFAULT_TIMEOUT).unwrap();
    let outcome = fetcher.fetch(period("20250801"), Category::Standard).await.unwrap();

    let FetchOutcome::Ready(file) = outcome else { panic!("expected a file") };
    assert_eq!(file.format, ListFormat::Xml);
    assert_eq!(
      file.path,
      dir.path().join("standard_aug25frl_xml").join("standard_aug25frl_xml.xml")
    );
    assert_eq!(file.read().await.unwrap(), XML.as_bytes());
  }

  #[tokio::test]
  async fn existing_extraction_skips_the_download() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/standard_jun15frl.zip"))
      .respond_with(
        ResponseTemplate::new(200).set_body_bytes(zip_of(&[("standard_jun15frl.txt", "x")])),
      )
      .expect(1)
      .mount(&server)
      .await;

    let fetcher = Fetcher::new(server.uri(), dir.path(), DEFAULT_TIMEOUT).unwrap();
    for _ in 0..2 {
      let outcome = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap();
      assert!(matches!(outcome, FetchOutcome::Ready(ref f) if f.format == ListFormat::FixedWidth));
    }
    // `expect(1)` is verified when the server drops.
  }

  #[tokio::test]
  async fn unfinished_extraction_is_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let full = "1503014 Carlsen\n4100018 Anand\n";
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/standard_jul15frl.zip"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_bytes(zip_of(&[("standard_jul15frl.txt", full)])),
      )
      .expect(1)
      .mount(&server)
      .await;

    // A crash mid-copy left a truncated data file and no marker.
    let dest = dir.path().join("standard_jul15frl");
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("standard_jul15frl.txt"), "1503014 Carlsen\n").unwrap();

    let fetcher = Fetcher::new(server.uri(), dir.path(), DEFAULT_TIMEOUT).unwrap();
    let outcome = fetcher.fetch(period("20150701"), Category::Standard).await.unwrap();
    let FetchOutcome::Ready(file) = outcome else { panic!("expected a file") };
    assert_eq!(file.read().await.unwrap(), full.as_bytes());
    assert!(dest.join(EXTRACTED_MARKER).is_file());

    // No staging directories are left behind.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .filter(|name| name.starts_with(".extract-"))
      .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
  }

  #[tokio::test]
  async fn failed_extraction_leaves_nothing_to_reuse() {
    let dir = tempfile::tempdir().unwrap();
    let server = serve(
      "standard_jun15frl.zip",
      ResponseTemplate::new(200)
        .set_body_bytes(zip_of(&[("a.txt", "1"), ("b.txt", "2")])),
    )
    .await;

    let fetcher = Fetcher::new(server.uri(), dir.path(), DEFAULT_TIMEOUT).unwrap();
    let err = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap_err();
    assert!(matches!(err, Error::MultipleDataFiles { .. }));
    assert!(!dir.path().join("standard_jun15frl").exists());
  }

  #[tokio::test]
  async fn not_found_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let server = serve("standard_jun15frl.zip", ResponseTemplate::new(404)).await;

    let fetcher = Fetcher::new(server.uri(), dir.path(), DEFAULT_TIMEOUT).unwrap();
    let outcome = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Unavailable { .. }));
  }

  #[tokio::test]
  async fn timeout_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let server = serve(
      "standard_jun15frl.zip",
      ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
    )
    .await;

    let fetcher =
      Fetcher::new(server.uri(), dir.path(), Duration::from_millis(200)).unwrap();
    let outcome = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Unavailable { .. }));
  }

  #[tokio::test]
  async fn server_error_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = serve("standard_jun15frl.zip", ResponseTemplate::new(500)).await;

    let fetcher = Fetcher::new(server.uri(), dir.path(), DEFAULT_TIMEOUT).unwrap();
    let err = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap_err();
    assert!(matches!(err, Error::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
  }

  #[tokio::test]
  async fn corrupt_archive_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let server = serve(
      "standard_jun15frl.zip",
      ResponseTemplate::new(200).set_body_bytes(b"definitely not a zip".to_vec()),
    )
    .await;

    let fetcher = Fetcher::new(server.uri(), dir.path(), DEFAULT_TIMEOUT).unwrap();
    let err = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap_err();
    assert!(matches!(err, Error::Archive { .. }));
  }

  #[tokio::test]
  async fn archive_must_hold_exactly_one_data_file() {
    let dir = tempfile::tempdir().unwrap();

    let none = serve(
      "standard_jun15frl.zip",
      ResponseTemplate::new(200).set_body_bytes(zip_of(&[("readme.pdf", "hi")])),
    )
    .await;
    let fetcher = Fetcher::new(none.uri(), dir.path().join("a"), DEFAULT_TIMEOUT).unwrap();
    let err = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap_err();
    assert!(matches!(err, Error::NoDataFile(_)));

    let two = serve(
      "standard_jun15frl.zip",
      ResponseTemplate::new(200)
        .set_body_bytes(zip_of(&[("a.txt", "1"), ("nested/b.xml", XML)])),
    )
    .await;
    let fetcher = Fetcher::new(two.uri(), dir.path().join("b"), DEFAULT_TIMEOUT).unwrap();
    let err = fetcher.fetch(period("20150601"), Category::Standard).await.unwrap_err();
    assert!(matches!(err, Error::MultipleDataFiles { ref files, .. } if files.len() == 2));
  }

  #[tokio::test]
  async fn local_files() {
    let dir = tempfile::tempdir().unwrap();

    let xml = dir.path().join("list.xml");
    std::fs::write(&xml, XML).unwrap();
    let file = DataFile::from_local(&xml, dir.path()).await.unwrap();
    assert_eq!(file, DataFile { path: xml, format: ListFormat::Xml });

    let archive = dir.path().join("rapid_jan15frl.zip");
    std::fs::write(&archive, zip_of(&[("rapid_jan15frl.txt", "x")])).unwrap();
    let file = DataFile::from_local(&archive, &dir.path().join("out")).await.unwrap();
    assert_eq!(file.format, ListFormat::FixedWidth);
    assert!(file.path.starts_with(dir.path().join("out").join("rapid_jan15frl")));

    let csv = dir.path().join("list.csv");
    std::fs::write(&csv, "").unwrap();
    assert!(matches!(
      DataFile::from_local(&csv, dir.path()).await,
      Err(Error::UnsupportedFile(_))
    ));

    assert!(matches!(
      DataFile::from_local(&dir.path().join("missing.xml"), dir.path()).await,
      Err(Error::Io { .. })
    ));
  }
}
