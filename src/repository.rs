use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::ResolutionRequest;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("deb-deps/", env!("CARGO_PKG_VERSION"));
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Не удалось инициализировать HTTP-клиент")]
    Client(#[source] reqwest::Error),

    #[error("Превышено время ожидания ответа от {url}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Не удалось запросить {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} вернул HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Не удалось прочитать индекс {location}")]
    Read {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("Не удалось распаковать индекс {location}")]
    Decompress {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("Индекс {location} не является корректным UTF-8 текстом")]
    Encoding { location: String },
}

/// Source of the raw `Packages` index for a resolution request.
pub trait IndexSource {
    fn fetch_index(&self, request: &ResolutionRequest) -> Result<String, RepositoryError>;
}

pub fn index_url(request: &ResolutionRequest) -> String {
    format!(
        "{}/dists/{}/{}/binary-{}/Packages.gz",
        request.repository_url.trim_end_matches('/'),
        request.release,
        request.component,
        request.architecture
    )
}

/// Downloads `Packages.gz` from a mirror.
pub struct HttpIndexSource {
    client: Client,
    show_progress: bool,
}

impl HttpIndexSource {
    pub fn new(show_progress: bool) -> Result<Self, RepositoryError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(RepositoryError::Client)?;

        Ok(Self {
            client,
            show_progress,
        })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, RepositoryError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| transport_error(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepositoryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|source| transport_error(url, source))?;
        Ok(bytes.to_vec())
    }
}

impl IndexSource for HttpIndexSource {
    fn fetch_index(&self, request: &ResolutionRequest) -> Result<String, RepositoryError> {
        let url = index_url(request);
        info!(%url, "fetching package index");

        let spinner = self.show_progress.then(|| fetch_spinner(&url));
        let downloaded = self.download(&url);
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let compressed = downloaded?;

        let text = decode_index(&url, &compressed)?;
        debug!(
            compressed = compressed.len(),
            decompressed = text.len(),
            "package index decompressed"
        );
        Ok(text)
    }
}

/// Reads a local `Packages` or `Packages.gz` file named by `repository_url`.
pub struct LocalIndexSource;

impl LocalIndexSource {
    fn path(request: &ResolutionRequest) -> PathBuf {
        PathBuf::from(&request.repository_url)
    }
}

impl IndexSource for LocalIndexSource {
    fn fetch_index(&self, request: &ResolutionRequest) -> Result<String, RepositoryError> {
        let path = Self::path(request);
        let location = path.display().to_string();
        info!(path = %location, "reading local package index");

        let bytes = fs::read(&path).map_err(|source| RepositoryError::Read {
            location: location.clone(),
            source,
        })?;
        decode_index(&location, &bytes)
    }
}

/// Decompresses gzip data (detected by magic bytes) and decodes it as UTF-8.
pub fn decode_index(location: &str, bytes: &[u8]) -> Result<String, RepositoryError> {
    let raw = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decompressed = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decompressed)
            .map_err(|source| RepositoryError::Decompress {
                location: location.to_string(),
                source,
            })?;
        decompressed
    } else if location.ends_with(".gz") {
        return Err(RepositoryError::Decompress {
            location: location.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, "отсутствует заголовок gzip"),
        });
    } else {
        bytes.to_vec()
    };

    String::from_utf8(raw).map_err(|_| RepositoryError::Encoding {
        location: location.to_string(),
    })
}

fn transport_error(url: &str, source: reqwest::Error) -> RepositoryError {
    if source.is_timeout() {
        RepositoryError::Timeout {
            url: url.to_string(),
            source,
        }
    } else {
        RepositoryError::Request {
            url: url.to_string(),
            source,
        }
    }
}

fn fetch_spinner(url: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Загрузка {url}"));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use anyhow::Result;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use reqwest::blocking::Client;
    use tempfile::tempdir;

    use super::{
        HttpIndexSource, IndexSource, LocalIndexSource, RepositoryError, decode_index, index_url,
    };
    use crate::model::ResolutionRequest;

    fn request(repository_url: &str) -> ResolutionRequest {
        ResolutionRequest {
            package_name: "curl".to_string(),
            package_version: "7.68.0".to_string(),
            repository_url: repository_url.to_string(),
            release: "focal".to_string(),
            component: "main".to_string(),
            architecture: "amd64".to_string(),
        }
    }

    fn gzip(text: &str) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes())?;
        Ok(encoder.finish()?)
    }

    // Bypasses any proxy from the environment so requests reach the local listener.
    fn local_source(timeout: Duration) -> Result<HttpIndexSource> {
        let client = Client::builder().no_proxy().timeout(timeout).build()?;
        Ok(HttpIndexSource {
            client,
            show_progress: false,
        })
    }

    /// Serves one connection: reads the request head, then writes `head` and `body`
    /// after `delay`. Returns the mirror base URL.
    fn serve_once(head: &'static str, body: Vec<u8>, delay: Duration) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base = format!("http://{}", listener.local_addr()?);

        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let Ok(reader_stream) = stream.try_clone() else {
                return;
            };
            let mut reader = BufReader::new(reader_stream);
            let mut line = String::new();
            while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }

            thread::sleep(delay);
            let response = format!(
                "{head}Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(&body);
        });

        Ok(base)
    }

    #[test]
    fn downloads_and_decodes_index_over_http() -> Result<()> {
        let text = "Package: curl\nVersion: 7.68.0\nDepends: libc6\n";
        let base = serve_once("HTTP/1.1 200 OK\r\n", gzip(text)?, Duration::ZERO)?;

        let source = local_source(Duration::from_secs(5))?;
        assert_eq!(source.fetch_index(&request(&base))?, text);
        Ok(())
    }

    #[test]
    fn non_success_status_is_status_error() -> Result<()> {
        let base = serve_once("HTTP/1.1 404 Not Found\r\n", Vec::new(), Duration::ZERO)?;

        let error = local_source(Duration::from_secs(5))?
            .fetch_index(&request(&base))
            .expect_err("ожидалась ошибка HTTP-статуса");
        match error {
            RepositoryError::Status { url, status } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/dists/focal/main/binary-amd64/Packages.gz"));
            }
            other => panic!("неожиданная ошибка: {other}"),
        }
        Ok(())
    }

    #[test]
    fn slow_mirror_is_timeout_error() -> Result<()> {
        let base = serve_once("HTTP/1.1 200 OK\r\n", Vec::new(), Duration::from_secs(2))?;

        let error = local_source(Duration::from_millis(200))?
            .fetch_index(&request(&base))
            .expect_err("ожидалась ошибка таймаута");
        assert!(matches!(error, RepositoryError::Timeout { .. }));
        Ok(())
    }

    #[test]
    fn cause_is_reported_as_source_only() {
        let error =
            decode_index("Packages.gz", b"\x1f\x8bnot gzip").expect_err("ожидалась ошибка");
        assert_eq!(error.to_string(), "Не удалось распаковать индекс Packages.gz");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn builds_index_url_from_request() {
        assert_eq!(
            index_url(&request("http://archive.ubuntu.com/ubuntu")),
            "http://archive.ubuntu.com/ubuntu/dists/focal/main/binary-amd64/Packages.gz"
        );
        assert_eq!(
            index_url(&request("http://archive.ubuntu.com/ubuntu/")),
            "http://archive.ubuntu.com/ubuntu/dists/focal/main/binary-amd64/Packages.gz"
        );
    }

    #[test]
    fn decodes_gzip_index() -> Result<()> {
        let text = "Package: curl\nVersion: 7.68.0\n";
        let decoded = decode_index("Packages.gz", &gzip(text)?)?;
        assert_eq!(decoded, text);
        Ok(())
    }

    #[test]
    fn rejects_corrupt_gzip() -> Result<()> {
        let mut bytes = gzip("Package: curl\nVersion: 7.68.0\n")?;
        let crc = bytes.len() - 8;
        bytes[crc] ^= 0xff;

        let error = decode_index("Packages.gz", &bytes).expect_err("ожидалась ошибка распаковки");
        assert!(matches!(error, RepositoryError::Decompress { .. }));
        Ok(())
    }

    #[test]
    fn rejects_plain_body_for_gz_location() {
        let error = decode_index("http://mirror/Packages.gz", b"<html>not found</html>")
            .expect_err("ожидалась ошибка распаковки");
        assert!(matches!(error, RepositoryError::Decompress { .. }));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let error = decode_index("Packages", &[0xff, 0xfe, 0x00])
            .expect_err("ожидалась ошибка кодировки");
        assert!(matches!(error, RepositoryError::Encoding { .. }));
    }

    #[test]
    fn reads_local_plain_and_gzip_indices() -> Result<()> {
        let dir = tempdir()?;
        let text = "Package: curl\nVersion: 7.68.0\nDepends: libc6\n";

        let plain = dir.path().join("Packages");
        std::fs::write(&plain, text)?;
        let loaded = LocalIndexSource.fetch_index(&request(&plain.display().to_string()))?;
        assert_eq!(loaded, text);

        let compressed = dir.path().join("Packages.gz");
        std::fs::write(&compressed, gzip(text)?)?;
        let loaded = LocalIndexSource.fetch_index(&request(&compressed.display().to_string()))?;
        assert_eq!(loaded, text);
        Ok(())
    }

    #[test]
    fn missing_local_index_is_repository_error() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("Packages");
        let error = LocalIndexSource
            .fetch_index(&request(&missing.display().to_string()))
            .expect_err("ожидалась ошибка чтения");
        assert!(matches!(error, RepositoryError::Read { .. }));
        Ok(())
    }
}
