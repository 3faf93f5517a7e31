use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, error, info};

/// 仅含提示信息的状态响应（删除、重命名等接口返回）
#[derive(Debug, Default, Deserialize)]
struct StatusResp {
    #[serde(default)]
    message: String,
}

/// 读取响应 body 并检查 HTTP 状态码
///
/// 非 2xx 状态统一转换为错误，错误信息中附带原始 body
async fn read_checked_body(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<(Vec<u8>, String)> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
    let body_str = String::from_utf8_lossy(&body_bytes).into_owned();
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, body_str));
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    Ok((body_bytes.to_vec(), body_str))
}

/// 通用 HTTP 响应处理函数：检查状态码后直接反序列化为业务结构体
/// 所有返回 JSON 数据的 API 都可以共用此方法
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<T> {
    let (body_bytes, body_str) = read_checked_body(response, operation_name).await?;

    // 从 bytes 反序列化（因为 body 已经被消费了）
    serde_json::from_slice::<T>(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        anyhow::anyhow!("反序列化响应失败: {:?}", e)
    })
}

/// 只关心状态码的接口（删除、重命名），body 解析失败不视为错误
pub async fn handle_status_response(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<()> {
    let (body_bytes, _) = read_checked_body(response, operation_name).await?;
    let resp = serde_json::from_slice::<StatusResp>(&body_bytes).unwrap_or_default();
    info!("[HTTP] {}完成: {}", operation_name, resp.message);
    Ok(())
}
