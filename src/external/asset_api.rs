use crate::config::AssetSourceConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetListResponse {
    pub success: bool,
    pub message: Option<String>,
    pub assets: Option<Vec<AssetEntry>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetEntry {
    /// 素材文件名, 如 cards/haru_year_2024_h1.webp
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// 卡片素材源客户端 (目录重建时拉取素材清单)
#[derive(Clone)]
pub struct AssetCatalogApi {
    client: Client,
    config: AssetSourceConfig,
}

impl AssetCatalogApi {
    pub fn new(config: AssetSourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn placeholder_ref(&self) -> &str {
        &self.config.placeholder_ref
    }

    /// 拉取素材清单 (仅文件名)
    pub async fn list_card_assets(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/list", self.config.base_url);

        let response = self.client.get(&url).send().await?;
        let result: AssetListResponse = response.json().await?;

        if !result.success {
            return Err(AppError::ExternalApiError(format!(
                "素材清单拉取失败: {}",
                result.message.unwrap_or_default()
            )));
        }

        Ok(result
            .assets
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.file_name)
            .collect())
    }
}
