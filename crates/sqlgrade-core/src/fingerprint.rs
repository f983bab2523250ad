use crate::model::{QuestionKind, Testcase};
use crate::render::RenderOptions;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub hex: String,
    pub components: Vec<String>,
}

pub fn sha256_hex(s: &str) -> String {
    sha256_bytes_hex(s.as_bytes())
}

pub fn sha256_bytes_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Everything that determines a testcase's golden result.
pub struct Context<'a> {
    pub question: &'a str,
    pub kind: QuestionKind,
    pub answer: &'a str,
    pub testcase: &'a Testcase,
    pub database_digest: Option<&'a str>,
    pub render: &'a RenderOptions,
}

/// Computes a deterministic fingerprint of one golden result's inputs.
///
/// A package whose stored fingerprint no longer matches was computed from a
/// different answer, database, engine or renderer and must be regenerated.
pub fn compute(ctx: Context<'_>) -> Fingerprint {
    let mut parts = Vec::new();

    parts.push(format!("question={}", ctx.question));
    parts.push(format!("kind={}", ctx.kind.as_str()));
    parts.push(format!("answer={}", ctx.answer));
    parts.push(format!("code={}", ctx.testcase.code));

    // serde_json output for these types has a stable field order
    let extra = serde_json::to_string(&ctx.testcase.extra).unwrap_or_default();
    parts.push(format!("extra={}", extra));

    parts.push(format!(
        "database={}",
        ctx.database_digest.unwrap_or("memory")
    ));
    parts.push(format!(
        "render=rows:{},width:{}",
        ctx.render.max_rows, ctx.render.max_width
    ));
    parts.push(format!("sqlite_version={}", rusqlite::version()));
    parts.push(format!("sqlgrade_version={}", env!("CARGO_PKG_VERSION")));

    let raw = parts.join("\n");
    let hex = sha256_hex(&raw);

    Fingerprint {
        hex,
        components: parts,
    }
}
