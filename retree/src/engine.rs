//! 正規表現のパース、書き換え、オートマトン構築。
pub mod ast;
pub mod compat;
pub mod fa;
pub mod generator;
pub mod optimizer;
pub mod parser;

pub use fa::{to_dfa, to_nfa, Dfa, FaError, Nfa};
pub use generator::generate;
pub use parser::{parse, ParseError, ParseOptions};

/// 正規表現をパースして最適化し、`/body/flags` 形式の文字列を返す。
///
/// # 利用例
///
/// ```
/// assert_eq!(retree::engine::optimize("/[a-zA-Z_0-9]+/").unwrap(), "/\\w+/");
/// ```
///
/// # 返り値
///
/// 入力された正規表現にエラーがある場合は Err を返す。
pub fn optimize(expr: &str) -> Result<String, ParseError> {
    let re = parse(expr, ParseOptions::default())?;
    Ok(generate(&optimizer::optimize(re)))
}

/// 正規表現をパースし、新しい構文を持たないエンジン向けに書き換える。
///
/// 名前付きグループは番号付きグループに、`s` フラグの `.` は文字クラスになる。
///
/// # 利用例
///
/// ```
/// assert_eq!(
///     retree::engine::compat_transpile("/(?<x>a)\\k<x>/").unwrap(),
///     "/(a)\\1/"
/// );
/// ```
///
/// # 返り値
///
/// 入力された正規表現にエラーがある場合は Err を返す。
pub fn compat_transpile(expr: &str) -> Result<String, ParseError> {
    let re = parse(expr, ParseOptions::default())?;
    Ok(generate(&compat::transpile(re)))
}
