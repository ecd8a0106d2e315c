//! コマンドライン引数。
use clap::{ArgAction, Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "retree",
    version,
    about = "Prints the AST, optimized forms and NFA/DFA tables of regular expressions",
    disable_version_flag = true,
    args_override_self = true
)]
pub struct Cli {
    /// A regular expression to be parsed
    #[arg(short, long)]
    pub expression: String,

    /// Whether to capture AST node locations
    #[arg(short, long)]
    pub loc: bool,

    /// Apply optimizer on the passed expression
    #[arg(short, long)]
    pub optimize: bool,

    /// Apply compat-transpiler on the passed expression
    #[arg(short, long)]
    pub compat: bool,

    /// Print NFA/DFA transition tables
    #[arg(short, long, value_enum)]
    pub table: Option<TableKind>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableKind {
    Nfa,
    Dfa,
    All,
}

impl TableKind {
    pub fn includes_nfa(self) -> bool {
        matches!(self, TableKind::Nfa | TableKind::All)
    }

    pub fn includes_dfa(self) -> bool {
        matches!(self, TableKind::Dfa | TableKind::All)
    }
}

/// 正規化後の設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub expression: String,
    pub loc: bool,
    pub optimize: bool,
    pub compat: bool,
    pub table: Option<TableKind>,
    /// 表と見出しを ANSI カラーで出力するか。
    pub color: bool,
}

impl Config {
    /// `strip_quotes` が true なら、シェルが残したクォートを取り除く。
    pub fn from_cli(cli: Cli, strip_quotes: bool) -> Self {
        Config {
            expression: normalize(&cli.expression, strip_quotes).to_string(),
            loc: cli.loc,
            optimize: cli.optimize,
            compat: cli.compat,
            table: cli.table,
            color: false,
        }
    }
}

/// 同じクォートで始まり終わる場合、先頭と末尾の 1 文字を取り除く。
/// クォート 1 文字だけなら空文字列になる。
pub fn normalize(expression: &str, strip_quotes: bool) -> &str {
    if !strip_quotes {
        return expression;
    }
    match ['\'', '"']
        .into_iter()
        .find(|&q| expression.starts_with(q) && expression.ends_with(q))
    {
        Some(_) => expression.get(1..expression.len() - 1).unwrap_or(""),
        None => expression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Config {
        let cli = Cli::try_parse_from(std::iter::once("retree").chain(args.iter().copied())).unwrap();
        Config::from_cli(cli, false)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("\"a+b\"", true), "a+b");
        assert_eq!(normalize("'a+b'", true), "a+b");
        assert_eq!(normalize("'a+b\"", true), "'a+b\"");
        assert_eq!(normalize("''", true), "");
        // 1 文字のクォートは開きと閉じを兼ねる
        assert_eq!(normalize("'", true), "");
        assert_eq!(normalize("\"", true), "");
        assert_eq!(normalize("'\"'", true), "\"");
        assert_eq!(normalize("\"a+b\"", false), "\"a+b\"");
    }

    #[test]
    fn test_flags() {
        let c = config(&["-e", "a|b", "-t", "all", "-l"]);
        assert_eq!(c.expression, "a|b");
        assert_eq!(c.table, Some(TableKind::All));
        assert!(c.loc);
        assert!(!c.optimize && !c.compat);
        assert!(!c.color);

        let c = config(&["--expression", "a", "--optimize", "--compat", "--table", "nfa"]);
        assert!(c.optimize && c.compat);
        assert_eq!(c.table, Some(TableKind::Nfa));
    }

    #[test]
    fn test_last_expression_wins() {
        let c = config(&["-e", "a", "-e", "b"]);
        assert_eq!(c.expression, "b");
    }

    #[test]
    fn test_invalid_invocations() {
        assert!(Cli::try_parse_from(["retree"]).is_err());
        assert!(Cli::try_parse_from(["retree", "-e", "a", "-t", "xyz"]).is_err());
        assert!(Cli::try_parse_from(["retree", "-e"]).is_err());
    }

    #[test]
    fn test_table_kind() {
        assert!(TableKind::All.includes_nfa() && TableKind::All.includes_dfa());
        assert!(!TableKind::Nfa.includes_dfa());
        assert!(!TableKind::Dfa.includes_nfa());
    }
}
