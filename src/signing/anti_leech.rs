//! Deterministic anti-leech tokens.
//!
//! The stream descriptor carries an anti-leech code such as
//! `wsSecret=..&wsTime=..&fm=<base64>&fs=..`. `fm` decodes to a template
//! with `$0..$3` placeholders; the md5 of the filled template is the
//! `wsSecret` the CDN checks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{md5_hex, SigningContext};
use crate::error::{Error, Result};
use crate::quality::Quality;

/// Fields copied from the code into the final query when non-empty.
const PASSTHROUGH: &[&str] = &["txyp", "fs", "sphdcdn", "sphdDC", "sphd", "exsphd"];

/// Parsed anti-leech code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AntiLeechCode {
    pairs: Vec<(String, String)>,
}

impl AntiLeechCode {
    pub fn parse(raw: &str) -> Self {
        let pairs = url::form_urlencoded::parse(raw.trim().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value for `key`, or `""`.
    pub fn get(&self, key: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }

    /// Decoded `fm` template.
    pub fn template(&self) -> Result<String> {
        let fm = self.get("fm");
        if fm.is_empty() {
            return Err(Error::signing("anti-leech code has no fm template"));
        }

        // Form decoding turns a raw '+' into ' '; padding is often stripped.
        let mut b64 = fm.replace(' ', "+").trim_end_matches('=').to_string();
        while b64.len() % 4 != 0 {
            b64.push('=');
        }

        let bytes = STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| Error::signing(format!("fm template is not base64: {e}")))?;
        String::from_utf8(bytes).map_err(|_| Error::signing("fm template is not UTF-8"))
    }
}

/// Signed query for one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntiLeechToken {
    pub ws_secret: String,
    pub query: String,
}

/// Bitrate ratio requested for a tier; `0` asks for the source.
pub fn ratio(quality: Quality) -> u32 {
    match quality {
        Quality::UHD => 8000,
        Quality::HD => 4000,
        Quality::SD => 2000,
        Quality::LD => 500,
        Quality::OD | Quality::BD => 0,
    }
}

pub fn fill_template(
    template: &str,
    session_id: &str,
    stream_name: &str,
    sequence: &str,
    ws_time: &str,
) -> String {
    template
        .replace("$0", session_id)
        .replace("$1", stream_name)
        .replace("$2", sequence)
        .replace("$3", ws_time)
}

/// Build the signed query for `stream_name`.
///
/// `ctx.secret` must hold the anonymous session id from this call's login.
pub fn sign(
    code: &AntiLeechCode,
    stream_name: &str,
    ctx: &SigningContext,
    quality: Quality,
) -> Result<AntiLeechToken> {
    let session_id = ctx
        .secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::UpstreamAuth("no anonymous session id for anti-leech token".into()))?;

    let ws_time = code.get("wsTime");
    let sequence = ctx.sequence.to_string();
    let filled = fill_template(&code.template()?, session_id, stream_name, &sequence, ws_time);
    let ws_secret = md5_hex(&filled);

    let ratio_param = ratio(quality).to_string();
    let mut params: Vec<(&str, &str)> = vec![
        ("wsSecret", ws_secret.as_str()),
        ("wsTime", ws_time),
        ("u", session_id),
        ("seqid", sequence.as_str()),
    ];
    params.extend(PASSTHROUGH.iter().map(|k| (*k, code.get(k))));
    params.push(("ratio", ratio_param.as_str()));

    let query = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(AntiLeechToken { ws_secret, query })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &str = "wsSecret=abc&wsTime=671f1a2b&fm=RFdxOEJjSjNoNkRKdDZUWV8kMF8kMV8kMl8kMw\
        &ctype=huya_live&fs=bgct&sphdcdn=al_7-tx_3-js_3-ws_7-bd_2-hw_2&sphdDC=huya\
        &sphd=264_*-265_*&exsphd=264_500,264_2000,264_4000,&t=100";
    const STREAM: &str = "1199561139-1199561139-5152114934-2399122379-10057-A-0-1";

    fn ctx() -> SigningContext {
        SigningContext {
            sequence: 17_290_000_000_000,
            ..SigningContext::new("")
        }
        .with_secret("1234567890")
    }

    #[test]
    fn decodes_unpadded_template() {
        let code = AntiLeechCode::parse(CODE);
        assert_eq!(code.template().unwrap(), "DWq8BcJ3h6DJt6TY_$0_$1_$2_$3");
        assert_eq!(code.get("wsTime"), "671f1a2b");
        assert_eq!(code.get("missing"), "");
    }

    #[test]
    fn substitutes_placeholders() {
        let filled = fill_template("k_$0_$1_$2_$3", "u", "s", "q", "t");
        assert_eq!(filled, "k_u_s_q_t");
    }

    #[test]
    fn secret_matches_precomputed_digest() {
        let token = sign(&AntiLeechCode::parse(CODE), STREAM, &ctx(), Quality::OD).unwrap();
        assert_eq!(token.ws_secret, "692727762777f1bf88f689d946902710");
    }

    #[test]
    fn query_keeps_order_and_drops_empty_fields() {
        let token = sign(&AntiLeechCode::parse(CODE), STREAM, &ctx(), Quality::HD).unwrap();
        assert_eq!(
            token.query,
            "wsSecret=692727762777f1bf88f689d946902710&wsTime=671f1a2b&u=1234567890\
             &seqid=17290000000000&fs=bgct&sphdcdn=al_7-tx_3-js_3-ws_7-bd_2-hw_2\
             &sphdDC=huya&sphd=264_*-265_*&exsphd=264_500,264_2000,264_4000,&ratio=4000"
        );
        assert!(!token.query.contains("txyp="));
    }

    #[test]
    fn ratio_table() {
        assert_eq!(ratio(Quality::OD), 0);
        assert_eq!(ratio(Quality::UHD), 8000);
        assert_eq!(ratio(Quality::HD), 4000);
        assert_eq!(ratio(Quality::SD), 2000);
        assert_eq!(ratio(Quality::LD), 500);
    }

    #[test]
    fn missing_session_is_auth_error() {
        let err = sign(
            &AntiLeechCode::parse(CODE),
            STREAM,
            &SigningContext::new(""),
            Quality::OD,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(_)));
    }

    #[test]
    fn missing_or_garbled_template_is_signing_error() {
        let no_fm = AntiLeechCode::parse("wsTime=1&fs=a");
        assert!(matches!(no_fm.template(), Err(Error::Signing(_))));

        let bad = AntiLeechCode::parse("fm=%%%%");
        assert!(matches!(bad.template(), Err(Error::Signing(_))));
    }
}
