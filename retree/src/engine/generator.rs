//! AST を正規表現の文字列に戻す。
use super::ast::*;

pub fn generate(re: &RegExp) -> String {
    let body = re.body.as_ref().map(generate_node).unwrap_or_default();
    format!("/{body}/{}", re.flags)
}

pub fn generate_node(node: &Node) -> String {
    match node {
        Node::Disjunction { left, right, .. } => format!(
            "{}|{}",
            generate_opt(left.as_deref()),
            generate_opt(right.as_deref())
        ),
        Node::Alternative { expressions, .. } => expressions.iter().map(generate_node).collect(),
        Node::Char(c) => generate_char(c),
        Node::CharacterClass {
            negative,
            expressions,
            ..
        } => {
            let items: String = expressions.iter().map(generate_node).collect();
            format!("[{}{items}]", if *negative { "^" } else { "" })
        }
        Node::ClassRange { from, to, .. } => {
            format!("{}-{}", generate_char(from), generate_char(to))
        }
        Node::Group {
            capturing,
            name,
            expression,
            ..
        } => {
            let open = match (capturing, name) {
                (false, _) => "(?:".to_string(),
                (true, Some(name)) => format!("(?<{name}>"),
                (true, None) => "(".to_string(),
            };
            format!("{open}{})", generate_opt(expression.as_deref()))
        }
        Node::Backreference {
            kind, reference, ..
        } => match kind {
            BackreferenceKind::Number => format!("\\{reference}"),
            BackreferenceKind::Name => format!("\\k<{reference}>"),
        },
        Node::Repetition {
            expression,
            quantifier,
            ..
        } => format!(
            "{}{}",
            generate_node(expression),
            generate_quantifier(quantifier)
        ),
        Node::Assertion {
            kind,
            negative,
            assertion,
            ..
        } => {
            let open = match (kind, negative) {
                (AssertionKind::Start, _) => return "^".to_string(),
                (AssertionKind::End, _) => return "$".to_string(),
                (AssertionKind::WordBoundary, _) => return "\\b".to_string(),
                (AssertionKind::NonWordBoundary, _) => return "\\B".to_string(),
                (AssertionKind::Lookahead, false) => "(?=",
                (AssertionKind::Lookahead, true) => "(?!",
                (AssertionKind::Lookbehind, false) => "(?<=",
                (AssertionKind::Lookbehind, true) => "(?<!",
            };
            format!("{open}{})", generate_opt(assertion.as_deref()))
        }
    }
}

fn generate_opt(node: Option<&Node>) -> String {
    node.map(generate_node).unwrap_or_default()
}

pub fn generate_char(c: &Char) -> String {
    if c.kind == CharKind::Simple && c.escaped {
        format!("\\{}", c.value)
    } else {
        c.value.clone()
    }
}

pub fn generate_quantifier(q: &Quantifier) -> String {
    let base = match (q.kind, q.from, q.to) {
        (QuantifierKind::Star, _, _) => "*".to_string(),
        (QuantifierKind::Plus, _, _) => "+".to_string(),
        (QuantifierKind::Question, _, _) => "?".to_string(),
        (QuantifierKind::Range, from, Some(to)) if from == Some(to) => format!("{{{to}}}"),
        (QuantifierKind::Range, from, Some(to)) => format!("{{{},{to}}}", from.unwrap_or(0)),
        (QuantifierKind::Range, from, None) => format!("{{{},}}", from.unwrap_or(0)),
    };
    if q.greedy {
        base
    } else {
        base + "?"
    }
}
