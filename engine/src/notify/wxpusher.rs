// WxPusher webhook delivery
use super::{html_body, Notifier};
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const SEND_URL: &str = "http://wxpusher.zjiecode.com/api/send/message";
const CONTENT_TYPE_HTML: u8 = 2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WxPusherPayload<'a> {
    app_token: &'a str,
    content: String,
    summary: &'a str,
    content_type: u8,
    uids: [&'a str; 1],
}

pub struct WxPusherNotifier {
    client: Client,
    app_token: String,
    uid: String,
}

impl WxPusherNotifier {
    pub fn new(app_token: String, uid: String, timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, app_token, uid })
    }

    fn payload<'a>(&'a self, title: &'a str, body: &str) -> WxPusherPayload<'a> {
        WxPusherPayload {
            app_token: &self.app_token,
            content: format!("<h1>{}</h1><br>{}", html_body(title), html_body(body)),
            summary: title,
            content_type: CONTENT_TYPE_HTML,
            uids: [&self.uid],
        }
    }
}

/// WxPusher reports success as `{"code": 1000, "success": true}`.
pub fn check_response(body: &str) -> EngineResult<()> {
    let value: Value = serde_json::from_str(body)?;
    let ok = value.get("success").and_then(Value::as_bool).unwrap_or(false)
        || value.get("code").and_then(Value::as_i64) == Some(1000);
    if ok {
        Ok(())
    } else {
        Err(EngineError::NotifyError(format!(
            "wxpusher rejected message: {}",
            value.get("msg").and_then(Value::as_str).unwrap_or("no message")
        )))
    }
}

#[async_trait]
impl Notifier for WxPusherNotifier {
    fn name(&self) -> &str {
        "wxpusher"
    }

    async fn notify(&self, title: &str, body: &str) -> EngineResult<()> {
        let payload = self.payload(title, body);
        let response = self.client.post(SEND_URL).json(&payload).send().await?.error_for_status()?;
        let text = response.text().await?;
        check_response(&text)?;
        tracing::info!(title = %title, "WxPusher message delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let notifier = WxPusherNotifier::new("AT_x".into(), "UID_y".into(), Duration::from_secs(1)).unwrap();
        let json = serde_json::to_value(notifier.payload("Daily", "line 1\nline 2")).unwrap();
        assert_eq!(json["appToken"], "AT_x");
        assert_eq!(json["contentType"], 2);
        assert_eq!(json["uids"][0], "UID_y");
        assert_eq!(json["summary"], "Daily");
        assert_eq!(json["content"], "<h1>Daily</h1><br>line 1<br>line 2");
    }

    #[test]
    fn test_check_response() {
        assert!(check_response(r#"{"code":1000,"msg":"处理成功","success":true}"#).is_ok());
        assert!(check_response(r#"{"code":1001,"msg":"appToken错误","success":false}"#).is_err());
    }
}
