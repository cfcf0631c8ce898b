//! Syntax tree of a collection expression.

use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::Tag;

/// The reference every catalog track belongs to.
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    /// `all`, a stored playlist or a named collection.
    Reference(String),
    /// Tracks whose `tag` matches `pattern` under the tag's match policy.
    TagFilter { tag: Tag, pattern: String },
    Not(Box<AstNode>),
    And(Box<AstNode>, Box<AstNode>),
    Or(Box<AstNode>, Box<AstNode>),
    /// Parenthesized subtree. Only exists while parsing; [`AstNode::collapse`]
    /// removes it.
    Group(Box<AstNode>),
}

impl AstNode {
    pub fn not(child: AstNode) -> Self {
        AstNode::Not(Box::new(child))
    }

    pub fn and(left: AstNode, right: AstNode) -> Self {
        AstNode::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: AstNode, right: AstNode) -> Self {
        AstNode::Or(Box::new(left), Box::new(right))
    }

    /// Strips every [`AstNode::Group`], keeping the shape the parentheses
    /// produced.
    pub fn collapse(self) -> Self {
        match self {
            AstNode::Group(inner) => (*inner).collapse(),
            AstNode::Not(child) => AstNode::not((*child).collapse()),
            AstNode::And(l, r) => AstNode::and((*l).collapse(), (*r).collapse()),
            AstNode::Or(l, r) => AstNode::or((*l).collapse(), (*r).collapse()),
            leaf => leaf,
        }
    }

    /// Names this expression refers to, `all` excluded.
    pub fn references(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut BTreeSet<String>) {
        match self {
            AstNode::Reference(name) if name != ALL => {
                names.insert(name.clone());
            }
            AstNode::Reference(_) | AstNode::TagFilter { .. } => {}
            AstNode::Not(child) | AstNode::Group(child) => child.collect_references(names),
            AstNode::And(l, r) | AstNode::Or(l, r) => {
                l.collect_references(names);
                r.collect_references(names);
            }
        }
    }
}

/// Writes `word` bare when it would lex back as the same single identifier,
/// quoted otherwise.
fn write_word(f: &mut fmt::Formatter<'_>, word: &str, allow_colon: bool) -> fmt::Result {
    let bare = !word.is_empty()
        && !["and", "or", "not"].iter().any(|k| word.eq_ignore_ascii_case(k))
        && word.chars().all(|c| {
            !c.is_whitespace()
                && !c.is_control()
                && !matches!(c, '(' | ')' | '"' | '=' | ';' | '|' | '`' | '{' | '}')
                && (allow_colon || c != ':')
        });
    if bare {
        f.write_str(word)
    } else {
        write!(f, "\"{}\"", word.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, node: &AstNode, parens: bool) -> fmt::Result {
            if parens {
                write!(f, "({node})")
            } else {
                write!(f, "{node}")
            }
        }

        match self {
            AstNode::Reference(name) => write_word(f, name, false),
            AstNode::TagFilter { tag, pattern } => {
                write!(f, "{tag}:")?;
                write_word(f, pattern, true)
            }
            AstNode::Not(child) => {
                f.write_str("NOT ")?;
                operand(f, child, matches!(**child, AstNode::And(..) | AstNode::Or(..)))
            }
            AstNode::And(l, r) => {
                operand(f, l, matches!(**l, AstNode::Or(..)))?;
                f.write_str(" AND ")?;
                operand(f, r, matches!(**r, AstNode::And(..) | AstNode::Or(..)))
            }
            AstNode::Or(l, r) => {
                operand(f, l, false)?;
                f.write_str(" OR ")?;
                operand(f, r, matches!(**r, AstNode::Or(..)))
            }
            AstNode::Group(inner) => write!(f, "({inner})"),
        }
    }
}
