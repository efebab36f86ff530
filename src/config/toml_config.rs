use crate::config::stack::StackLayout;
use crate::utils::error::{ProvisionError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use std::path::Path;

impl StackLayout {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProvisionError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，未指定的欄位使用預設值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = substitute_env_vars(content)?;

        let layout: StackLayout = toml::from_str(&processed_content)
            .map_err(|e| ProvisionError::config(format!("TOML parsing error: {}", e)))?;
        layout.validate()?;
        Ok(layout)
    }
}

/// 替換環境變數 (例如 ${PG_IMAGE})；未設定的變數保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ProvisionError::config(format!("invalid substitution pattern: {}", e)))?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}
