//! 오브젝트 스토리지.
//!
//! 고객 사진 파일을 S3 호환 스토리지에 저장합니다. 클라이언트는 시작 시
//! 한 번 생성되어 [`AppState`](crate::state::AppState)를 통해 공유됩니다.

mod memory;
mod s3;
pub mod sigv4;

use async_trait::async_trait;

pub use memory::InMemoryObjectStore;
pub use s3::S3PhotoStore;

/// 스토리지 에러.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("스토리지 설정 오류: {0}")]
    Config(String),
    #[error("스토리지 요청 실패: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("스토리지 응답 오류 ({operation}): HTTP {status}")]
    Status { operation: &'static str, status: u16 },
    #[error("스토리지를 사용할 수 없습니다")]
    Unavailable,
}

/// 파일 저장소.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 객체를 저장하고 공개 URL을 반환합니다.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// 허용된 사진 확장자의 Content-Type.
///
/// 공개 버킷에서 `inline`으로 제공되므로 스크립트를 담을 수 있는 형식(svg 등)은
/// 허용하지 않습니다. 허용 목록에 없으면 `None`.
pub fn image_content_type(extension: &str) -> Option<&'static str> {
    let content_type = match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(content_type)
}

/// 업로드 파일 이름에서 확장자 추출. 확장자가 없으면 `None`.
pub fn file_extension(filename: &str) -> Option<&str> {
    let (_, extension) = filename.rsplit_once('.')?;
    (!extension.is_empty()).then_some(extension)
}

/// 충돌하지 않는 객체 키 (`{uuid}.{ext}`).
pub fn photo_object_key(extension: &str) -> String {
    format!("{}.{}", uuid::Uuid::new_v4(), extension.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_content_type() {
        assert_eq!(image_content_type("png"), Some("image/png"));
        assert_eq!(image_content_type("JPG"), Some("image/jpeg"));
        assert_eq!(image_content_type("jpeg"), Some("image/jpeg"));
        assert_eq!(image_content_type("svg"), None);
        assert_eq!(image_content_type("html"), None);
        assert_eq!(image_content_type("tiff"), None);
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.png"), Some("png"));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz"));
        assert_eq!(file_extension("photo"), None);
        assert_eq!(file_extension("photo."), None);
    }

    #[test]
    fn test_photo_object_key() {
        let key = photo_object_key("PNG");
        assert!(key.ends_with(".png"));
        assert_eq!(key.len(), 36 + 4);
        assert_ne!(photo_object_key("png"), photo_object_key("png"));
    }
}
