//! AST の最適化。
//!
//! どの書き換えもマッチする言語を変えない。書き換えは葉から根へ向かって行い、
//! 木が変化しなくなるまで全体を繰り返す。
use super::{ast::*, generator::generate_node};
use log::debug;
use std::collections::HashSet;

/// 書き換えを繰り返す回数の上限。
const MAX_PASSES: usize = 64;

/// 文字クラスの外で構文上の意味を持つ文字。
const SYNTAX_CHARS: &str = "^$\\.*+?()[]{}|/";

/// 文字クラスの中で構文上の意味を持つ文字。
const CLASS_SYNTAX_CHARS: &str = "\\]^-";

pub fn optimize(mut re: RegExp) -> RegExp {
    re.loc = None;
    let mut body = re.body.take().map(|mut node| {
        node.strip_loc();
        node
    });

    for pass in 0..MAX_PASSES {
        let next = body.clone().and_then(rewrite);
        if next == body {
            debug!("optimizer: fixpoint after {pass} passes");
            break;
        }
        body = next;
    }

    re.body = body;
    re
}

/// 葉から根への 1 パス。`None` は空文字列にマッチするだけで取り除けるノード。
fn rewrite(node: Node) -> Option<Node> {
    match node {
        Node::Disjunction { left, right, .. } => {
            let left = left.and_then(|n| rewrite(*n));
            let right = right.and_then(|n| rewrite(*n));
            let node = Node::Disjunction {
                left: left.map(Box::new),
                right: right.map(Box::new),
                loc: None,
            };
            Node::disjunction(remove_duplicate_branches(node.branches()))
        }
        Node::Alternative { expressions, .. } => {
            let expressions = expressions.into_iter().filter_map(rewrite).collect();
            let expressions = merge_quantifiers(ungroup_sequences(expressions));
            Node::alternative(expressions)
        }
        Node::Char(c) => Some(Node::Char(char_code_to_simple(c, SYNTAX_CHARS))),
        Node::CharacterClass {
            negative,
            expressions,
            ..
        } => {
            let expressions = expressions.into_iter().map(class_item).collect();
            let expressions = class_to_meta(remove_duplicate_items(expressions));
            Some(class_to_single_char(negative, expressions))
        }
        Node::ClassRange { .. } => Some(class_item(node)),
        Node::Group {
            capturing,
            number,
            name,
            expression,
            ..
        } => {
            let expression = expression
                .and_then(|e| rewrite(*e))
                .map(single_chars_to_class);
            match (capturing, expression) {
                (false, None) => None,
                (false, Some(e)) if is_atom(&e) => Some(e),
                (capturing, expression) => Some(Node::Group {
                    capturing,
                    number,
                    name,
                    expression: expression.map(Box::new),
                    loc: None,
                }),
            }
        }
        Node::Repetition {
            expression,
            quantifier,
            ..
        } => {
            let expression = rewrite(*expression)?;
            quantifier_to_symbol(expression, quantifier)
        }
        Node::Assertion {
            kind,
            negative,
            assertion,
            ..
        } => Some(Node::Assertion {
            kind,
            negative,
            assertion: assertion.and_then(|a| rewrite(*a)).map(Box::new),
            loc: None,
        }),
        node @ Node::Backreference { .. } => Some(node),
    }
}

/// グループで囲まずに量指定子を付けられるか。
fn is_atom(node: &Node) -> bool {
    matches!(
        node,
        Node::Char(_) | Node::CharacterClass { .. } | Node::Group { .. } | Node::Backreference { .. }
    )
}

/// エスケープ不要な表示可能文字の `\x41` を `A` にする。
fn char_code_to_simple(c: Char, syntax: &str) -> Char {
    let convertible = matches!(
        c.kind,
        CharKind::Hex | CharKind::Unicode | CharKind::Oct
    );
    match c.symbol {
        Some(symbol) if convertible && (' '..='~').contains(&symbol) && !syntax.contains(symbol) => {
            Char::simple(symbol)
        }
        _ => c,
    }
}

/// 文字クラスの要素を簡約する。`a-a` は `a` に、文字コードは単純な文字にする。
fn class_item(node: Node) -> Node {
    match node {
        Node::ClassRange { from, to, .. } => {
            let from = char_code_to_simple(from, CLASS_SYNTAX_CHARS);
            let to = char_code_to_simple(to, CLASS_SYNTAX_CHARS);
            if from.code_point == to.code_point {
                Node::Char(from)
            } else {
                Node::ClassRange { from, to, loc: None }
            }
        }
        Node::Char(c) => Node::Char(char_code_to_simple(c, CLASS_SYNTAX_CHARS)),
        node => node,
    }
}

fn remove_duplicate_items(expressions: Vec<Node>) -> Vec<Node> {
    let mut seen = HashSet::new();
    expressions
        .into_iter()
        .filter(|e| seen.insert(generate_node(e)))
        .collect()
}

/// `[0-9]` -> `[\d]`, `[a-zA-Z0-9_]` -> `[\w]`.
fn class_to_meta(expressions: Vec<Node>) -> Vec<Node> {
    let items: HashSet<String> = expressions.iter().map(generate_node).collect();
    let is = |set: &[&str]| items.len() == set.len() && set.iter().all(|s| items.contains(*s));

    if is(&["0-9"]) || is(&["\\d"]) {
        vec![Node::Char(Char::meta("\\d", None))]
    } else if is(&["a-z", "A-Z", "0-9", "_"]) || is(&["a-z", "A-Z", "\\d", "_"]) {
        vec![Node::Char(Char::meta("\\w", None))]
    } else {
        expressions
    }
}

/// `[a]` -> `a`, `[\d]` -> `\d`, `[^\d]` -> `\D`.
fn class_to_single_char(negative: bool, expressions: Vec<Node>) -> Node {
    if let [Node::Char(c)] = expressions.as_slice() {
        match (negative, c.kind, c.symbol) {
            (false, CharKind::Simple, Some(symbol)) if SYNTAX_CHARS.contains(symbol) => {
                return Node::Char(Char::escaped(symbol));
            }
            (false, CharKind::Simple, Some(symbol)) => return Node::Char(Char::simple(symbol)),
            // `\b` がバックスペースになるのは文字クラスの中だけ
            (false, _, _) if !c.is_meta("\\b") => return Node::Char(c.clone()),
            (true, CharKind::Meta, None) if matches!(c.value.as_str(), "\\d" | "\\w" | "\\s") => {
                return Node::Char(Char::meta(&c.value.to_uppercase(), None));
            }
            _ => (),
        }
    }
    Node::CharacterClass {
        negative,
        expressions,
        loc: None,
    }
}

fn remove_duplicate_branches(branches: Vec<Option<Node>>) -> Vec<Option<Node>> {
    let mut seen = HashSet::new();
    branches
        .into_iter()
        .filter(|b| seen.insert(b.as_ref().map(generate_node)))
        .collect()
}

/// `(a|b|c)` -> `([abc])`.
fn single_chars_to_class(node: Node) -> Node {
    let mut chars = Vec::new();
    if !matches!(node, Node::Disjunction { .. }) || !collect_branch_chars(&node, &mut chars) {
        return node;
    }
    Node::CharacterClass {
        negative: false,
        expressions: chars
            .into_iter()
            .map(|c| match c.symbol {
                Some(s) if c.kind == CharKind::Simple && CLASS_SYNTAX_CHARS.contains(s) => {
                    Node::Char(Char::escaped(s))
                }
                _ => Node::Char(c),
            })
            .collect(),
        loc: None,
    }
}

fn collect_branch_chars(node: &Node, chars: &mut Vec<Char>) -> bool {
    match node {
        Node::Disjunction {
            left: Some(left),
            right: Some(right),
            ..
        } => collect_branch_chars(left, chars) && collect_branch_chars(right, chars),
        Node::Char(c) if !c.is_meta(".") => {
            chars.push(c.clone());
            true
        }
        _ => false,
    }
}

/// 連接だけを含む非キャプチャグループを展開する。`a(?:bc)d` は `abcd`。
fn ungroup_sequences(expressions: Vec<Node>) -> Vec<Node> {
    let mut result = Vec::with_capacity(expressions.len());
    for e in expressions {
        match e {
            Node::Group {
                capturing: false,
                expression: Some(inner),
                ..
            } if matches!(*inner, Node::Alternative { .. }) => {
                if let Node::Alternative { expressions, .. } = *inner {
                    result.extend(expressions);
                }
            }
            e => result.push(e),
        }
    }
    result
}

/// `aa*` and `a*a` -> `a+`.
fn merge_quantifiers(expressions: Vec<Node>) -> Vec<Node> {
    let mut result: Vec<Node> = Vec::with_capacity(expressions.len());
    for e in expressions {
        let merged = match (result.last(), &e) {
            (Some(prev), Node::Repetition { expression, quantifier, .. })
                if is_greedy_star(quantifier) && **expression == *prev =>
            {
                Some((**expression).clone())
            }
            (Some(Node::Repetition { expression, quantifier, .. }), next)
                if is_greedy_star(quantifier) && **expression == *next =>
            {
                Some(next.clone())
            }
            _ => None,
        };

        match merged {
            Some(expression) => {
                result.pop();
                result.push(Node::Repetition {
                    expression: Box::new(expression),
                    quantifier: Quantifier::symbol(QuantifierKind::Plus, true),
                    loc: None,
                });
            }
            None => result.push(e),
        }
    }
    result
}

fn is_greedy_star(q: &Quantifier) -> bool {
    q.greedy && q.bounds() == (0, None)
}

/// `{0,}` -> `*`, `{1,}` -> `+`, `{0,1}` -> `?`, `{1}` -> nothing, `{0}` -> empty.
fn quantifier_to_symbol(expression: Node, quantifier: Quantifier) -> Option<Node> {
    let greedy = quantifier.greedy;
    let kind = match quantifier.bounds() {
        (1, Some(1)) => return Some(expression),
        (0, Some(0)) => return None,
        (0, None) => QuantifierKind::Star,
        (1, None) => QuantifierKind::Plus,
        (0, Some(1)) => QuantifierKind::Question,
        _ => {
            return Some(Node::Repetition {
                expression: Box::new(expression),
                quantifier: Quantifier { loc: None, ..quantifier },
                loc: None,
            })
        }
    };
    Some(Node::Repetition {
        expression: Box::new(expression),
        quantifier: Quantifier::symbol(kind, greedy),
        loc: None,
    })
}

#[cfg(test)]
mod tests {
    use crate::engine::{generator::generate, optimize as optimize_expr};

    fn optimized(expr: &str) -> String {
        optimize_expr(expr).unwrap()
    }

    #[test]
    fn test_quantifier_ranges() {
        assert_eq!(optimized("/a{0,}b{1,}c{0,1}d{1}e{1,1}/"), "/a*b+c?de/");
        assert_eq!(optimized("/a{0,}?/"), "/a*?/");
        assert_eq!(optimized("/a{2,3}/"), "/a{2,3}/");
    }

    #[test]
    fn test_char_codes() {
        assert_eq!(optimized("/\\x41\\u0042/"), "/AB/");
        // '.' はエスケープを外すと意味が変わる
        assert_eq!(optimized("/\\x2e/"), "/\\x2e/");
    }

    #[test]
    fn test_classes() {
        assert_eq!(optimized("/[a-a]/"), "/a/");
        assert_eq!(optimized("/[aab]/"), "/[ab]/");
        assert_eq!(optimized("/[0-9]/"), "/\\d/");
        assert_eq!(optimized("/[^0-9]/"), "/\\D/");
        assert_eq!(optimized("/[a-zA-Z0-9_]/"), "/\\w/");
        assert_eq!(optimized("/[_0-9a-zA-Z]+/"), "/\\w+/");
        assert_eq!(optimized("/[.]/"), "/\\./");
    }

    #[test]
    fn test_disjunctions() {
        assert_eq!(optimized("/a|a|b/"), "/a|b/");
        assert_eq!(optimized("/(a|b|c)/"), "/([abc])/");
        assert_eq!(optimized("/(?:a|b)/"), "/[ab]/");
    }

    #[test]
    fn test_groups() {
        assert_eq!(optimized("/a(?:)b/"), "/ab/");
        assert_eq!(optimized("/(?:a)+/"), "/a+/");
        assert_eq!(optimized("/x(?:ab)y/"), "/xaby/");
        assert_eq!(optimized("/(?:ab)+/"), "/(?:ab)+/");
    }

    #[test]
    fn test_merge_quantifiers() {
        assert_eq!(optimized("/aa*/"), "/a+/");
        assert_eq!(optimized("/a*a/"), "/a+/");
        assert_eq!(optimized("/a{0,}a/"), "/a+/");
    }

    #[test]
    fn test_keeps_flags() {
        let re = crate::engine::parse("/a{1}/gi", Default::default()).unwrap();
        assert_eq!(generate(&super::optimize(re)), "/a/gi");
    }
}
