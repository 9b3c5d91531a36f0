// 该文件是 Yunjian （云检） 项目的一部分。
// src/upload.rs - 产物上传与交互确认
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;
use tracing::info;
use url::Url;

/// 交互确认接口。测试注入固定应答即可同时覆盖两个分支。
pub trait Confirm {
  fn confirm(&mut self, prompt: &str) -> std::io::Result<bool>;
}

/// 终端 y/n 确认
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
  fn confirm(&mut self, prompt: &str) -> std::io::Result<bool> {
    print!("{prompt} (y/n): ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
  }
}

/// 跳过交互，总是接受（--assume-yes）
pub struct AssumeYes;

impl Confirm for AssumeYes {
  fn confirm(&mut self, _prompt: &str) -> std::io::Result<bool> {
    Ok(true)
  }
}

/// 对象存储接口，管线只依赖 put 语义。
pub trait ObjectStore {
  type Error: std::error::Error + Send + Sync + 'static;

  fn put_object(&self, key: &str, path: &Path) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("对象存储端点无效: {0}")]
  InvalidEndpoint(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("HTTP 错误: {0}")]
  Http(#[from] Box<ureq::Error>),
  #[error("上传 {key} 失败，HTTP 状态码 {status}")]
  Status { status: u16, key: String },
}

/// S3 兼容对象存储客户端：对 `{endpoint}/{bucket}/{key}` 做同步 PUT。
/// 端点与凭证取自环境变量 S3_ENDPOINT / S3_ACCESS_KEY / S3_SECRET_KEY，
/// 无重试，首个失败即终止；已上传对象不回滚。
#[derive(Debug)]
pub struct HttpObjectStore {
  endpoint: Url,
  bucket: String,
  credentials: Option<(String, String)>,
  agent: ureq::Agent,
}

const DEFAULT_ENDPOINT: &str = "https://s3.amazonaws.com";

impl HttpObjectStore {
  pub fn from_env(bucket: &str) -> Result<Self, UploadError> {
    let endpoint =
      std::env::var("S3_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let credentials = match (
      std::env::var("S3_ACCESS_KEY"),
      std::env::var("S3_SECRET_KEY"),
    ) {
      (Ok(access_key), Ok(secret_key)) => Some((access_key, secret_key)),
      _ => None,
    };
    Self::new(&endpoint, bucket, credentials)
  }

  pub fn new(
    endpoint: &str,
    bucket: &str,
    credentials: Option<(String, String)>,
  ) -> Result<Self, UploadError> {
    let endpoint = Url::parse(endpoint)
      .map_err(|err| UploadError::InvalidEndpoint(format!("{endpoint}: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
      return Err(UploadError::InvalidEndpoint(format!(
        "不支持的协议 '{}'",
        endpoint.scheme()
      )));
    }

    Ok(Self {
      endpoint,
      bucket: bucket.to_string(),
      credentials,
      agent: ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(60))
        .build(),
    })
  }

  // 按路径段编码对象键，保留 '/' 分隔符
  fn object_url(&self, key: &str) -> String {
    let encoded_key = key
      .split('/')
      .map(|segment| urlencoding::encode(segment).into_owned())
      .collect::<Vec<_>>()
      .join("/");
    format!(
      "{}/{}/{}",
      self.endpoint.as_str().trim_end_matches('/'),
      urlencoding::encode(&self.bucket),
      encoded_key
    )
  }
}

impl ObjectStore for HttpObjectStore {
  type Error = UploadError;

  fn put_object(&self, key: &str, path: &Path) -> Result<(), Self::Error> {
    let data = std::fs::read(path)?;

    let mut request = self
      .agent
      .put(&self.object_url(key))
      .set("Content-Type", content_type(path));
    if let Some((access_key, secret_key)) = &self.credentials {
      // S3 兼容网关的 Basic 认证，完整的 AWS SigV4 不在范围内
      let token = BASE64.encode(format!("{access_key}:{secret_key}"));
      request = request.set("Authorization", &format!("Basic {token}"));
    }

    match request.send_bytes(&data) {
      Ok(_) => Ok(()),
      Err(ureq::Error::Status(status, _)) => Err(UploadError::Status {
        status,
        key: key.to_string(),
      }),
      Err(err) => Err(UploadError::Http(Box::new(err))),
    }
  }
}

/// 按扩展名推断 Content-Type
pub fn content_type(path: &Path) -> &'static str {
  match path.extension().and_then(|ext| ext.to_str()) {
    Some("json") => "application/json",
    Some("txt") => "text/plain",
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    _ => "application/octet-stream",
  }
}

/// 一次运行产出的本地产物清单
#[derive(Debug, Clone)]
pub struct Artifacts {
  pub detections_json: PathBuf,
  pub report: PathBuf,
  pub preview: PathBuf,
  pub annotated: Vec<PathBuf>,
}

impl Artifacts {
  /// 上传对象总数：三个固定产物加每张标注图像一个
  pub fn object_count(&self) -> usize {
    3 + self.annotated.len()
  }
}

/// 按固定顺序上传全部产物：detections.json、report.txt、
/// sample_detections.png、然后逐张标注图像。返回上传对象数。
pub fn upload_artifacts<S: ObjectStore>(
  store: &S,
  prefix: &str,
  artifacts: &Artifacts,
) -> Result<usize, S::Error> {
  store.put_object(&format!("{prefix}/detections.json"), &artifacts.detections_json)?;
  info!("已上传 detections.json");

  store.put_object(&format!("{prefix}/report.txt"), &artifacts.report)?;
  info!("已上传 report.txt");

  store.put_object(
    &format!("{prefix}/sample_detections.png"),
    &artifacts.preview,
  )?;
  info!("已上传 sample_detections.png");

  for path in &artifacts.annotated {
    let name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());
    store.put_object(&format!("{prefix}/annotated_images/{name}"), path)?;
  }
  info!("已上传 {} 张标注图像", artifacts.annotated.len());

  Ok(artifacts.object_count())
}
