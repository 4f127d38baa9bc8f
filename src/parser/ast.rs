// AST (Abstract Syntax Tree) definitions for the expression language

use crate::memory::value::Value;
use std::fmt;

/// Character range of a node or token in the source expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Shift a span by `offset` characters (used for template segments)
    pub fn shifted(self, offset: u32) -> Self {
        Span::new(self.start + offset, self.end + offset)
    }

    /// Merge two spans into one that covers both
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

/// Unary operators (increment/decrement live in [`ExprKind::Update`])
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,    // -x
    Plus,   // +x
    Not,    // !x
    BitNot, // ~x
}

/// Assignment operators; `Compound(op)` covers `+=`, `<<=`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinOp),
}

/// `++` or `--`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// The closed set of intrinsic functions understood by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    GetRegVal,
    FindSymbol,
    CalcMemUsed,
    SizeOf,
    SymbolExists,
    OffsetOf,
    Running,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 7] = [
        Intrinsic::GetRegVal,
        Intrinsic::FindSymbol,
        Intrinsic::CalcMemUsed,
        Intrinsic::SizeOf,
        Intrinsic::SymbolExists,
        Intrinsic::OffsetOf,
        Intrinsic::Running,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::GetRegVal => "__GetRegVal",
            Intrinsic::FindSymbol => "__FindSymbol",
            Intrinsic::CalcMemUsed => "__CalcMemUsed",
            Intrinsic::SizeOf => "__size_of",
            Intrinsic::SymbolExists => "__Symbol_exists",
            Intrinsic::OffsetOf => "__Offset_of",
            Intrinsic::Running => "__Running",
        }
    }

    /// Intrinsics whose arguments name a symbol or register and are
    /// passed through verbatim instead of being evaluated.
    pub fn takes_names(self) -> bool {
        matches!(
            self,
            Intrinsic::GetRegVal
                | Intrinsic::FindSymbol
                | Intrinsic::SizeOf
                | Intrinsic::SymbolExists
                | Intrinsic::OffsetOf
        )
    }

    pub fn arity(self) -> usize {
        match self {
            Intrinsic::CalcMemUsed => 4,
            Intrinsic::Running => 0,
            _ => 1,
        }
    }
}

/// One piece of a printf template
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Format { spec: char, expr: Box<Expr> },
}

/// Expression node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Value),
    Identifier(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    Intrinsic {
        which: Intrinsic,
        args: Vec<Expr>,
    },
    /// `type:member[:enumerator]`
    ColonPath(Vec<String>),
    Printf(Vec<Segment>),
}

/// An expression node: kind, source span and the folded constant (if any)
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub constant: Option<Value>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            constant: None,
        }
    }

    /// Identifier, member access or index: the forms that designate storage.
    pub fn is_reference(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
        )
    }

    /// True if evaluating this expression can change state: an assignment,
    /// an increment or decrement, or a call, anywhere in the tree.
    pub fn has_side_effects(&self) -> bool {
        match &self.kind {
            ExprKind::Assign { .. } | ExprKind::Update { .. } | ExprKind::Call { .. } => true,
            ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::ColonPath(_) => false,
            ExprKind::Member { object, .. } => object.has_side_effects(),
            ExprKind::Index { array, index } => array.has_side_effects() || index.has_side_effects(),
            ExprKind::Unary { operand, .. } => operand.has_side_effects(),
            ExprKind::Binary { left, right, .. } => left.has_side_effects() || right.has_side_effects(),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => test.has_side_effects() || consequent.has_side_effects() || alternate.has_side_effects(),
            ExprKind::Intrinsic { args, .. } => args.iter().any(Expr::has_side_effects),
            ExprKind::Printf(segments) => segments.iter().any(|segment| match segment {
                Segment::Text(_) => false,
                Segment::Format { expr, .. } => expr.has_side_effects(),
            }),
        }
    }

    /// Short label used in error messages
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::Literal(v) => v.to_string(),
            ExprKind::Identifier(name) => name.clone(),
            ExprKind::Member { object, property } => {
                format!("{}.{}", object.describe(), property)
            }
            ExprKind::Index { array, .. } => format!("{}[..]", array.describe()),
            ExprKind::ColonPath(parts) => parts.join(":"),
            ExprKind::Call { callee, .. } => format!("{}()", callee),
            ExprKind::Intrinsic { which, .. } => format!("{}()", which.name()),
            ExprKind::Unary { .. } => "unary expression".to_string(),
            ExprKind::Update { .. } => "update expression".to_string(),
            ExprKind::Binary { op, .. } => format!("'{}' expression", op.symbol()),
            ExprKind::Conditional { .. } => "conditional expression".to_string(),
            ExprKind::Assign { .. } => "assignment".to_string(),
            ExprKind::Printf(_) => "format template".to_string(),
        }
    }
}
