// Statement nodes of a component description

use super::expression::Expression;
use super::types::TypeRef;

/// `var` statement: a value kept in the memory cache
#[derive(Debug, Clone, PartialEq)]
pub struct VarSpec {
    pub name: String,
    pub ty: TypeRef,
    pub value: Option<Expression>,
    /// Append a new element on every execution instead of overwriting
    pub append: bool,
}

impl VarSpec {
    pub fn new(name: &str, ty: &str) -> Self {
        VarSpec {
            name: name.to_string(),
            ty: TypeRef::from_name(ty),
            value: None,
            append: false,
        }
    }

    pub fn value(mut self, expr: &str) -> Self {
        self.value = Some(Expression::parse(expr));
        self
    }

    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }
}

/// `read` statement: a block of elements at a fixed address
#[derive(Debug, Clone, PartialEq)]
pub struct ReadSpec {
    pub name: String,
    pub ty: TypeRef,
    /// Target symbol providing the base address
    pub symbol: Option<String>,
    /// Signed byte offset added to the symbol address
    pub offset: Option<Expression>,
    /// Element count
    pub size: Option<Expression>,
    /// Read once and keep across refreshes
    pub constant: bool,
}

impl ReadSpec {
    pub fn new(name: &str, ty: &str) -> Self {
        ReadSpec {
            name: name.to_string(),
            ty: TypeRef::from_name(ty),
            symbol: None,
            offset: None,
            size: None,
            constant: false,
        }
    }

    pub fn symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    pub fn offset(mut self, expr: &str) -> Self {
        self.offset = Some(Expression::parse(expr));
        self
    }

    pub fn size(mut self, expr: &str) -> Self {
        self.size = Some(Expression::parse(expr));
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }
}

/// `readlist` statement: arrays, pointer tables and linked lists
#[derive(Debug, Clone, PartialEq)]
pub struct ReadListSpec {
    pub name: String,
    pub ty: TypeRef,
    pub symbol: Option<String>,
    pub offset: Option<Expression>,
    /// Maximum number of elements
    pub count: Option<Expression>,
    /// Member holding the address of the next element
    pub next: Option<String>,
    /// `symbol + offset` holds pointers to the elements
    pub based: bool,
    /// Drop previously collected elements first
    pub init: bool,
    pub constant: bool,
}

impl ReadListSpec {
    pub fn new(name: &str, ty: &str) -> Self {
        ReadListSpec {
            name: name.to_string(),
            ty: TypeRef::from_name(ty),
            symbol: None,
            offset: None,
            count: None,
            next: None,
            based: false,
            init: false,
            constant: false,
        }
    }

    pub fn symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    pub fn offset(mut self, expr: &str) -> Self {
        self.offset = Some(Expression::parse(expr));
        self
    }

    pub fn count(mut self, expr: &str) -> Self {
        self.count = Some(Expression::parse(expr));
        self
    }

    pub fn next(mut self, member: &str) -> Self {
        self.next = Some(member.to_string());
        self
    }

    pub fn based(mut self) -> Self {
        self.based = true;
        self
    }

    pub fn init(mut self) -> Self {
        self.init = true;
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }
}

/// `list` / `listout` loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
    pub var: String,
    pub ty: TypeRef,
    pub start: Option<Expression>,
    pub limit: Option<Expression>,
    pub while_: Option<Expression>,
}

impl LoopSpec {
    pub fn new(var: &str) -> Self {
        LoopSpec {
            var: var.to_string(),
            ty: TypeRef::from_name("int32_t"),
            start: None,
            limit: None,
            while_: None,
        }
    }

    pub fn ty(mut self, ty: &str) -> Self {
        self.ty = TypeRef::from_name(ty);
        self
    }

    pub fn start(mut self, expr: &str) -> Self {
        self.start = Some(Expression::parse(expr));
        self
    }

    pub fn limit(mut self, expr: &str) -> Self {
        self.limit = Some(Expression::parse(expr));
        self
    }

    pub fn while_(mut self, expr: &str) -> Self {
        self.while_ = Some(Expression::parse(expr));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Object { name: String },
    Var(VarSpec),
    Calc { exprs: Vec<Expression> },
    Read(ReadSpec),
    ReadList(ReadListSpec),
    List(LoopSpec),
    ListOut(LoopSpec),
    Out { name: Expression },
    Item {
        property: Option<Expression>,
        value: Option<Expression>,
    },
    Print {
        property: Option<Expression>,
        value: Option<Expression>,
    },
}

impl NodeKind {
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Object { .. } => "object",
            NodeKind::Var(_) => "var",
            NodeKind::Calc { .. } => "calc",
            NodeKind::Read(_) => "read",
            NodeKind::ReadList(_) => "readlist",
            NodeKind::List(_) => "list",
            NodeKind::ListOut(_) => "listout",
            NodeKind::Out { .. } => "out",
            NodeKind::Item { .. } => "item",
            NodeKind::Print { .. } => "print",
        }
    }
}

/// One statement of a description, with its nested statements
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Line of the statement in its source file
    pub line: u32,
    pub cond: Option<Expression>,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(line: u32, kind: NodeKind) -> Self {
        Node {
            line,
            cond: None,
            kind,
            children: Vec::new(),
        }
    }

    pub fn object(line: u32, name: &str) -> Self {
        Self::new(line, NodeKind::Object { name: name.to_string() })
    }

    pub fn var(line: u32, spec: VarSpec) -> Self {
        Self::new(line, NodeKind::Var(spec))
    }

    pub fn calc(line: u32, exprs: &[&str]) -> Self {
        Self::new(
            line,
            NodeKind::Calc {
                exprs: exprs.iter().map(|e| Expression::parse(e)).collect(),
            },
        )
    }

    pub fn read(line: u32, spec: ReadSpec) -> Self {
        Self::new(line, NodeKind::Read(spec))
    }

    pub fn readlist(line: u32, spec: ReadListSpec) -> Self {
        Self::new(line, NodeKind::ReadList(spec))
    }

    pub fn list(line: u32, spec: LoopSpec) -> Self {
        Self::new(line, NodeKind::List(spec))
    }

    pub fn listout(line: u32, spec: LoopSpec) -> Self {
        Self::new(line, NodeKind::ListOut(spec))
    }

    pub fn out(line: u32, name: &str) -> Self {
        Self::new(line, NodeKind::Out { name: Expression::template(name) })
    }

    /// `item` with display name and value templates; an empty name takes
    /// its text from the first `print` child
    pub fn item(line: u32, property: &str, value: &str) -> Self {
        Self::new(
            line,
            NodeKind::Item {
                property: template(property),
                value: template(value),
            },
        )
    }

    pub fn print(line: u32, property: &str, value: &str) -> Self {
        Self::new(
            line,
            NodeKind::Print {
                property: template(property),
                value: template(value),
            },
        )
    }

    /// Attach a condition
    pub fn when(mut self, cond: &str) -> Self {
        self.cond = Some(Expression::parse(cond));
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn with_children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    /// Name used in logs: the declared symbol or display name
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Object { name } => name.clone(),
            NodeKind::Var(spec) => spec.name.clone(),
            NodeKind::Read(spec) => spec.name.clone(),
            NodeKind::ReadList(spec) => spec.name.clone(),
            NodeKind::List(spec) | NodeKind::ListOut(spec) => spec.var.clone(),
            NodeKind::Out { name } => name.text.clone(),
            NodeKind::Item { property, .. } | NodeKind::Print { property, .. } => property
                .as_ref()
                .map(|p| p.text.clone())
                .unwrap_or_default(),
            NodeKind::Calc { .. } => String::new(),
        }
    }

    /// Symbol this statement declares in the memory cache, with its type
    pub fn declared_symbol(&self) -> Option<(&str, &TypeRef)> {
        match &self.kind {
            NodeKind::Var(spec) => Some((&spec.name, &spec.ty)),
            NodeKind::Read(spec) => Some((&spec.name, &spec.ty)),
            NodeKind::ReadList(spec) => Some((&spec.name, &spec.ty)),
            NodeKind::List(spec) | NodeKind::ListOut(spec) => Some((&spec.var, &spec.ty)),
            _ => None,
        }
    }

    /// Pre-order walk over this node and its descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

fn template(text: &str) -> Option<Expression> {
    (!text.is_empty()).then(|| Expression::template(text))
}
