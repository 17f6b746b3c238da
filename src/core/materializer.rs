use crate::core::placeholders;
use crate::domain::model::ImageAssets;
use crate::utils::error::{Result, SiteError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const PRIMARY_DOCUMENT: &str = "index.html";
const IMAGES_SUBDIR: &str = "images";
// 託管在 Netlify,其他平台的部署清單不需要跟著發佈
const FOREIGN_MANIFESTS: &[&str] = &["vercel.json"];

/// 模板實體化:把模板目錄完整複製到輸出目錄,寫入圖片資產,
/// 再對主文件跑佔位符替換。重跑會整個覆蓋,不殘留舊配置。
pub struct TemplateMaterializer {
    template_dir: PathBuf,
}

impl TemplateMaterializer {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    pub async fn materialize(
        &self,
        output_dir: &Path,
        config: &HashMap<String, String>,
        images: &ImageAssets,
    ) -> Result<()> {
        tracing::info!("📂 Materializing template into {}", output_dir.display());

        // 先清空輸出目錄,保證完全覆蓋前一次的產出
        if output_dir.exists() {
            fs::remove_dir_all(output_dir)?;
        }
        fs::create_dir_all(output_dir)?;
        copy_tree(&self.template_dir, output_dir)?;

        for manifest in FOREIGN_MANIFESTS {
            let path = output_dir.join(manifest);
            if path.exists() {
                fs::remove_file(&path)?;
                tracing::debug!("🔶 Dropped foreign deploy manifest: {}", manifest);
            }
        }

        let mut values = config.clone();
        write_images(output_dir, images, &mut values)?;

        // 主文件在記憶體中完成替換後才落盤,不會留下半成品
        let index_path = output_dir.join(PRIMARY_DOCUMENT);
        let html = fs::read_to_string(&index_path)?;
        let prepared = placeholders::prepare_values(&values);
        let rendered = placeholders::substitute(&html, &prepared)?;
        fs::write(&index_path, rendered)?;

        tracing::info!("📂 Materialization complete: {}", output_dir.display());
        Ok(())
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// 解碼 base64 圖片(接受 data URL 前綴),寫進 images/ 並把相對路徑
// 注入對應的固定欄位
fn write_images(
    output_dir: &Path,
    images: &ImageAssets,
    values: &mut HashMap<String, String>,
) -> Result<()> {
    if images.is_empty() {
        return Ok(());
    }

    let images_dir = output_dir.join(IMAGES_SUBDIR);
    fs::create_dir_all(&images_dir)?;

    let slots = [
        (&images.logo, "logo.png", "LOGO_IMAGE"),
        (&images.cover, "cover.png", "COVER_IMAGE"),
        (&images.profile, "profile.png", "PROFILE_IMAGE"),
        (&images.middle, "middle.png", "MIDDLE_IMAGE"),
    ];

    for (data, file_name, key) in slots {
        if let Some(encoded) = data {
            let bytes = decode_data_url(encoded)?;
            fs::write(images_dir.join(file_name), bytes)?;
            values.insert(
                key.to_string(),
                format!("{}/{}", IMAGES_SUBDIR, file_name),
            );
            tracing::debug!("💾 Image asset written: {}/{}", IMAGES_SUBDIR, file_name);
        }
    }

    Ok(())
}

fn decode_data_url(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.find(";base64,") {
        Some(idx) => &encoded[idx + ";base64,".len()..],
        None => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| SiteError::ValidationError {
            message: format!("Invalid base64 image payload: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url_with_prefix() {
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(b"png-bytes"));
        assert_eq!(decode_data_url(&encoded).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_decode_raw_base64() {
        let encoded = STANDARD.encode(b"raw");
        assert_eq!(decode_data_url(&encoded).unwrap(), b"raw");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_data_url("not base64 at all!!!").is_err());
    }
}
