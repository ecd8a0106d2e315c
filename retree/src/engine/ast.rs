//! 正規表現の AST。
//!
//! ノードの形は JavaScript の正規表現 AST として一般的なものに合わせている。
//! どのノードも `type` タグを持ち、要求されたときは開始と終了の位置を表す
//! `loc` オブジェクトも持つ。
use serde::{Serialize, Serializer};

/// 入力中のノード境界の位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Loc {
    pub source: String,
    pub start: Position,
    pub end: Position,
}

/// 正規表現リテラル全体 `/body/flags`。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct RegExp {
    pub body: Option<Node>,
    pub flags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

impl RegExp {
    pub fn has_flag(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    pub fn remove_flag(&mut self, flag: char) {
        self.flags.retain(|c| c != flag);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    Disjunction {
        left: Option<Box<Node>>,
        right: Option<Box<Node>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
    Alternative {
        expressions: Vec<Node>,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
    Char(Char),
    CharacterClass {
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        negative: bool,
        expressions: Vec<Node>,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
    ClassRange {
        #[serde(serialize_with = "char_node")]
        from: Char,
        #[serde(serialize_with = "char_node")]
        to: Char,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
    Group {
        capturing: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        number: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        expression: Option<Box<Node>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
    Backreference {
        kind: BackreferenceKind,
        number: usize,
        reference: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
    Repetition {
        expression: Box<Node>,
        quantifier: Quantifier,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
    Assertion {
        kind: AssertionKind,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        negative: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        assertion: Option<Box<Node>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        loc: Option<Loc>,
    },
}

impl Node {
    /// JSON 出力に現れるノード種別の名前。
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Disjunction { .. } => "Disjunction",
            Node::Alternative { .. } => "Alternative",
            Node::Char(_) => "Char",
            Node::CharacterClass { .. } => "CharacterClass",
            Node::ClassRange { .. } => "ClassRange",
            Node::Group { .. } => "Group",
            Node::Backreference { .. } => "Backreference",
            Node::Repetition { .. } => "Repetition",
            Node::Assertion { .. } => "Assertion",
        }
    }

    pub fn as_char(&self) -> Option<&Char> {
        match self {
            Node::Char(c) => Some(c),
            _ => None,
        }
    }

    /// 左結合の選択を作る。
    ///
    /// `a|b|c` は `Disjunction(Disjunction(a, b), c)` になる。
    pub fn disjunction(branches: Vec<Option<Node>>) -> Option<Node> {
        let mut iter = branches.into_iter();
        let first = iter.next()?;
        iter.fold(first, |left, right| {
            Some(Node::Disjunction {
                left: left.map(Box::new),
                right: right.map(Box::new),
                loc: None,
            })
        })
    }

    /// 選択の木を左から順に枝のリストへ平らにする。
    pub fn branches(self) -> Vec<Option<Node>> {
        match self {
            Node::Disjunction { left, right, .. } => {
                let mut branches = match left {
                    Some(left) => left.branches(),
                    None => vec![None],
                };
                branches.push(right.map(|r| *r));
                branches
            }
            node => vec![Some(node)],
        }
    }

    /// 連接を作る。要素が 0 個か 1 個なら畳む。
    pub fn alternative(mut expressions: Vec<Node>) -> Option<Node> {
        match expressions.len() {
            0 => None,
            1 => expressions.pop(),
            _ => Some(Node::Alternative {
                expressions,
                loc: None,
            }),
        }
    }

    /// このノードと子孫から位置情報を取り除く。
    pub fn strip_loc(&mut self) {
        match self {
            Node::Disjunction { left, right, loc } => {
                *loc = None;
                for side in [left, right].into_iter().flatten() {
                    side.strip_loc();
                }
            }
            Node::Alternative { expressions, loc } | Node::CharacterClass { expressions, loc, .. } => {
                *loc = None;
                expressions.iter_mut().for_each(Node::strip_loc);
            }
            Node::Char(c) => c.loc = None,
            Node::ClassRange { from, to, loc } => {
                *loc = None;
                from.loc = None;
                to.loc = None;
            }
            Node::Group {
                expression, loc, ..
            } => {
                *loc = None;
                if let Some(e) = expression {
                    e.strip_loc();
                }
            }
            Node::Backreference { loc, .. } => *loc = None,
            Node::Repetition {
                expression,
                quantifier,
                loc,
            } => {
                *loc = None;
                quantifier.loc = None;
                expression.strip_loc();
            }
            Node::Assertion { assertion, loc, .. } => {
                *loc = None;
                if let Some(a) = assertion {
                    a.strip_loc();
                }
            }
        }
    }
}

/// 1 文字、エスケープ、文字クラスの略記のいずれか。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Char {
    /// 入力上の文字。単純な文字のエスケープはバックスラッシュを除く。
    pub value: String,
    pub kind: CharKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<char>,
    #[serde(rename = "codePoint", skip_serializing_if = "Option::is_none")]
    pub code_point: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub escaped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

impl Char {
    pub fn simple(c: char) -> Self {
        Char {
            value: c.to_string(),
            kind: CharKind::Simple,
            symbol: Some(c),
            code_point: Some(c as u32),
            escaped: false,
            loc: None,
        }
    }

    pub fn escaped(c: char) -> Self {
        Char {
            escaped: true,
            ..Char::simple(c)
        }
    }

    /// `\d`、`.`、`\n` などの略記。1 文字を表すものは `symbol` を持つ。
    pub fn meta(value: &str, symbol: Option<char>) -> Self {
        Char {
            value: value.to_string(),
            kind: CharKind::Meta,
            symbol,
            code_point: symbol.map(|c| c as u32),
            escaped: false,
            loc: None,
        }
    }

    pub fn is_meta(&self, value: &str) -> bool {
        self.kind == CharKind::Meta && self.value == value
    }

    /// ちょうど 1 つのコードポイントにマッチするか。
    pub fn is_single(&self) -> bool {
        self.code_point.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CharKind {
    Simple,
    Meta,
    Control,
    Hex,
    Unicode,
    Decimal,
    Oct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackreferenceKind {
    Number,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssertionKind {
    #[serde(rename = "^")]
    Start,
    #[serde(rename = "$")]
    End,
    #[serde(rename = "\\b")]
    WordBoundary,
    #[serde(rename = "\\B")]
    NonWordBoundary,
    Lookahead,
    Lookbehind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Quantifier {
    pub kind: QuantifierKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<usize>,
    pub greedy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

impl Quantifier {
    pub fn symbol(kind: QuantifierKind, greedy: bool) -> Self {
        Quantifier {
            kind,
            from: None,
            to: None,
            greedy,
            loc: None,
        }
    }

    /// `{from,to}`。上限がなければ `None`。
    pub fn range(from: usize, to: Option<usize>, greedy: bool) -> Self {
        Quantifier {
            kind: QuantifierKind::Range,
            from: Some(from),
            to,
            greedy,
            loc: None,
        }
    }

    /// 繰り返しの下限と上限。
    pub fn bounds(&self) -> (usize, Option<usize>) {
        match self.kind {
            QuantifierKind::Star => (0, None),
            QuantifierKind::Plus => (1, None),
            QuantifierKind::Question => (0, Some(1)),
            QuantifierKind::Range => (self.from.unwrap_or(0), self.to),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuantifierKind {
    #[serde(rename = "*")]
    Star,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "?")]
    Question,
    Range,
}

fn char_node<S: Serializer>(c: &Char, serializer: S) -> Result<S::Ok, S::Error> {
    Node::Char(c.clone()).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjunction_roundtrip_branches() {
        let branches = vec![
            Some(Node::Char(Char::simple('a'))),
            None,
            Some(Node::Char(Char::simple('c'))),
        ];
        let node = Node::disjunction(branches.clone()).unwrap();
        assert!(matches!(node, Node::Disjunction { .. }));
        assert_eq!(node.branches(), branches);
    }

    #[test]
    fn test_alternative_collapses() {
        assert_eq!(Node::alternative(vec![]), None);
        assert_eq!(
            Node::alternative(vec![Node::Char(Char::simple('a'))]),
            Some(Node::Char(Char::simple('a')))
        );
    }

    #[test]
    fn test_char_serialization() {
        let json = serde_json::to_value(Node::Char(Char::simple('a'))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Char",
                "value": "a",
                "kind": "simple",
                "symbol": "a",
                "codePoint": 97
            })
        );
    }

    #[test]
    fn test_class_range_serializes_tagged_chars() {
        let node = Node::ClassRange {
            from: Char::simple('a'),
            to: Char::simple('z'),
            loc: None,
        };
        let json = serde_json::to_value(node).unwrap();
        assert_eq!(json["type"], "ClassRange");
        assert_eq!(json["from"]["type"], "Char");
        assert_eq!(json["to"]["symbol"], "z");
    }
}
