//! 新しい構文を古いエンジンでも解釈できる形に書き換える。
//!
//! - `s` フラグ: `.` を `[\0-\uFFFF]` (`u` があれば `[\0-\u{10FFFF}]`) にする
//! - 名前付きグループ: `(?<name>a)` を `(a)` に、`\k<name>` を `\N` にする
//! - `x` フラグ: 取り除く。空白とコメントはパーサが読み飛ばしている
use super::ast::*;
use log::debug;

pub fn transpile(mut re: RegExp) -> RegExp {
    let dot_all = re.has_flag('s');
    let unicode = re.has_flag('u');
    debug!("compat: dotAll = {dot_all}, unicode = {unicode}");

    if let Some(body) = re.body.as_mut() {
        rewrite(body, dot_all, unicode);
    }

    re.remove_flag('s');
    re.remove_flag('x');
    re
}

fn rewrite(node: &mut Node, dot_all: bool, unicode: bool) {
    if dot_all && node.as_char().is_some_and(|c| c.is_meta(".")) {
        *node = any_char_class(unicode);
        return;
    }

    match node {
        Node::Group { name, expression, .. } => {
            *name = None;
            if let Some(e) = expression {
                rewrite(e, dot_all, unicode);
            }
        }
        Node::Backreference {
            kind,
            number,
            reference,
            ..
        } => {
            *kind = BackreferenceKind::Number;
            *reference = number.to_string();
        }
        Node::Disjunction { left, right, .. } => {
            for side in [left, right].into_iter().flatten() {
                rewrite(side, dot_all, unicode);
            }
        }
        Node::Alternative { expressions, .. } => {
            for e in expressions {
                rewrite(e, dot_all, unicode);
            }
        }
        Node::Repetition { expression, .. } => rewrite(expression, dot_all, unicode),
        Node::Assertion {
            assertion: Some(a), ..
        } => rewrite(a, dot_all, unicode),
        _ => (),
    }
}

/// `[\0-\uFFFF]`。unicode モードでは `[\0-\u{10FFFF}]`。
fn any_char_class(unicode: bool) -> Node {
    let (value, code) = if unicode {
        ("\\u{10FFFF}", 0x10FFFF)
    } else {
        ("\\uFFFF", 0xFFFF)
    };
    Node::CharacterClass {
        negative: false,
        expressions: vec![Node::ClassRange {
            from: Char {
                value: "\\0".to_string(),
                kind: CharKind::Decimal,
                symbol: Some('\0'),
                code_point: Some(0),
                escaped: false,
                loc: None,
            },
            to: Char {
                value: value.to_string(),
                kind: CharKind::Unicode,
                symbol: char::from_u32(code),
                code_point: Some(code),
                escaped: false,
                loc: None,
            },
            loc: None,
        }],
        loc: None,
    }
}
