//! Script-evaluated signing.
//!
//! The room page embeds an obfuscated `ub98484234` function. Called
//! normally it `eval`s a generated signer and returns an opaque value; with
//! the `eval` defused it returns the signer's source instead. That source
//! is then patched so the md5 it would compute through `CryptoJS` is
//! supplied by us, and run to produce the final `v/did/tt/sign` set.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{md5_hex, SigningContext};
use crate::error::{Error, Result};
use crate::js_engine::ScriptEvaluator;

/// Fragment from the anchor variable through the signer function, up to the
/// next function declaration.
static FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(vdwdae325w_64we[\s\S]*function ub98484234[\s\S]*?)function")
        .expect("static regex")
});
/// The auto-evaluating tail of the signer function.
static EVAL_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"eval.*?;\}").expect("static regex"));
static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"v=(\d+)").expect("static regex"));
static RETURN_RT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"return rt;\}\);?").expect("static regex"));

const FINGERPRINT_ENTRY: &str = "ub98484234";
const SIGN_ENTRY: &str = "sign";
const CRYPTO_MD5_CALL: &str = "CryptoJS.MD5(cb).toString()";

/// Signed parameter set accepted by the stream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSignature {
    /// Fingerprint version.
    pub v: String,
    pub did: String,
    /// Timestamp the signature was computed for.
    pub tt: String,
    /// 32-char lowercase hex signature.
    pub sign: String,
}

/// Runs the platform's signer through a [`ScriptEvaluator`].
pub struct ScriptSigner<'a> {
    evaluator: &'a dyn ScriptEvaluator,
}

impl<'a> ScriptSigner<'a> {
    pub fn new(evaluator: &'a dyn ScriptEvaluator) -> Self {
        Self { evaluator }
    }

    /// Sign `room_id` using the signer embedded in `page`.
    pub fn sign(&self, page: &str, room_id: &str, ctx: &SigningContext) -> Result<ScriptSignature> {
        self.sign_fragment(extract_fragment(page)?, room_id, ctx)
    }

    /// Sign with a fragment already cut out by [`extract_fragment`].
    pub fn sign_fragment(
        &self,
        fragment: &str,
        room_id: &str,
        ctx: &SigningContext,
    ) -> Result<ScriptSignature> {
        let defused = neutralize_eval(fragment);

        let source = self.evaluator.execute(&defused, FINGERPRINT_ENTRY, &[])?;
        let version = fingerprint_version(&source)?;

        let tt = ctx.timestamp.to_string();
        let digest = content_digest(room_id, &ctx.device_id, &tt, &version);
        let signer = rewrite_signer(&source, &digest);
        debug!(room_id, %version, nonce = %ctx.nonce, "running extracted signer");

        let out = self
            .evaluator
            .execute(&signer, SIGN_ENTRY, &[room_id, &ctx.device_id, &tt])?;
        parse_signature(&out)
    }
}

/// [`ScriptSigner::sign_fragment`] on the blocking pool.
///
/// Script execution is CPU-bound, so concurrent signings must not share an
/// async worker.
pub async fn sign_blocking(
    evaluator: Arc<dyn ScriptEvaluator>,
    fragment: Arc<str>,
    room_id: String,
    ctx: SigningContext,
) -> Result<ScriptSignature> {
    tokio::task::spawn_blocking(move || {
        ScriptSigner::new(evaluator.as_ref()).sign_fragment(&fragment, &room_id, &ctx)
    })
    .await
    .map_err(|e| Error::signing(format!("signer task failed: {e}")))?
}

pub fn extract_fragment(page: &str) -> Result<&str> {
    FRAGMENT
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::signing("signer fragment not found in page"))
}

/// Make the signer return its generated source instead of evaluating it.
pub fn neutralize_eval(fragment: &str) -> String {
    EVAL_WRAPPER.replace_all(fragment, "strc;}").into_owned()
}

pub fn fingerprint_version(source: &str) -> Result<String> {
    VERSION
        .captures(source)
        .map(|c| c[1].to_string())
        .ok_or_else(|| Error::signing("fingerprint version missing from signer source"))
}

pub fn content_digest(room_id: &str, device_id: &str, timestamp: &str, version: &str) -> String {
    md5_hex(&format!("{room_id}{device_id}{timestamp}{version}"))
}

/// Turn the anonymous signer expression into a named `sign` function with
/// the md5 already filled in.
pub fn rewrite_signer(source: &str, digest: &str) -> String {
    RETURN_RT
        .replace_all(source, "return rt;}")
        .replace("(function (", "function sign(")
        .replace(CRYPTO_MD5_CALL, &format!("\"{digest}\""))
}

/// Values of a `v=..&did=..&tt=..&sign=..` string, in order.
pub fn parse_signature(query: &str) -> Result<ScriptSignature> {
    let values: Vec<&str> = query
        .split('&')
        .filter_map(|pair| pair.split_once('=').map(|(_, v)| v))
        .collect();

    match values.as_slice() {
        [v, did, tt, sign] => Ok(ScriptSignature {
            v: (*v).to_string(),
            did: (*did).to_string(),
            tt: (*tt).to_string(),
            sign: (*sign).to_string(),
        }),
        _ => Err(Error::signing(format!(
            "expected 4 signed parameters, got {}",
            values.len()
        ))),
    }
}
