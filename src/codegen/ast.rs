//! Declaration Tree
//!
//! Abstract statements, expressions and function declarations produced by the
//! builders. Rendering to source text belongs to the downstream serializer;
//! the `Display` impls here are compact and meant for logs and diagnostics.

use serde::Serialize;
use std::fmt;

// =============================================================================
// Type Expressions
// =============================================================================

/// A type as written in generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    /// `name` or `qualifier.name`
    Named { qualifier: Option<String>, name: String },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    /// The empty interface
    Any,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named { qualifier: None, name: name.into() }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        TypeExpr::Named { qualifier: Some(qualifier.into()), name: name.into() }
    }

    pub fn pointer(element: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(element))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named { qualifier: Some(q), name } => write!(f, "{}.{}", q, name),
            TypeExpr::Named { qualifier: None, name } => write!(f, "{}", name),
            TypeExpr::Pointer(element) => write!(f, "*{}", element),
            TypeExpr::Slice(element) => write!(f, "[]{}", element),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Any => write!(f, "interface{{}}"),
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Ident(String),
    Nil,
    /// `target.field`
    Selector { target: Box<Expr>, field: String },
    /// `*value`
    Deref(Box<Expr>),
    /// `&value`
    AddressOf(Box<Expr>),
    /// `function(args...)`
    Call { function: String, args: Vec<Expr> },
    /// `receiver.method(args...)`
    MethodCall { receiver: Box<Expr>, method: String, args: Vec<Expr> },
    /// `value.(T)`
    TypeAssert { value: Box<Expr>, target: TypeExpr },
    /// `make(map[K]V)`
    MakeMap { key: TypeExpr, value: TypeExpr },
    /// `make([]T, 0, capacity)`
    MakeSlice { element: TypeExpr, capacity: Box<Expr> },
    /// `value != nil`
    NotNil(Box<Expr>),
    /// `!value`
    Not(Box<Expr>),
    /// `T{}`
    Composite(TypeExpr),
    /// A string literal
    Str(String),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn selector(target: Expr, field: impl Into<String>) -> Self {
        Expr::Selector { target: Box::new(target), field: field.into() }
    }

    pub fn deref(value: Expr) -> Self {
        Expr::Deref(Box::new(value))
    }

    pub fn address_of(value: Expr) -> Self {
        Expr::AddressOf(Box::new(value))
    }

    pub fn method_call(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::MethodCall { receiver: Box::new(receiver), method: method.into(), args }
    }

    pub fn not_nil(value: Expr) -> Self {
        Expr::NotNil(Box::new(value))
    }

    pub fn not(value: Expr) -> Self {
        Expr::Not(Box::new(value))
    }

    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call { function: function.into(), args }
    }

    /// Is this a call to `method`, at any depth?
    pub fn calls_method(&self, method: &str) -> bool {
        match self {
            Expr::Ident(_)
            | Expr::Nil
            | Expr::MakeMap { .. }
            | Expr::Composite(_)
            | Expr::Str(_) => false,
            Expr::MethodCall { receiver, method: m, args } => {
                m == method
                    || receiver.calls_method(method)
                    || args.iter().any(|a| a.calls_method(method))
            }
            Expr::Call { args, .. } => args.iter().any(|a| a.calls_method(method)),
            Expr::Selector { target, .. } => target.calls_method(method),
            Expr::Deref(value)
            | Expr::AddressOf(value)
            | Expr::NotNil(value)
            | Expr::Not(value) => value.calls_method(method),
            Expr::TypeAssert { value, .. } => value.calls_method(method),
            Expr::MakeSlice { capacity, .. } => capacity.calls_method(method),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Nil => write!(f, "nil"),
            Expr::Selector { target, field } => write!(f, "{}.{}", target, field),
            Expr::Deref(value) => write!(f, "*{}", value),
            Expr::AddressOf(value) => write!(f, "&{}", value),
            Expr::Call { function, args } => write!(f, "{}({})", function, join(args)),
            Expr::MethodCall { receiver, method, args } => {
                // Parenthesize so `(*x).M()` does not read as `*(x.M())`
                match receiver.as_ref() {
                    Expr::Deref(_) => write!(f, "({}).{}({})", receiver, method, join(args)),
                    _ => write!(f, "{}.{}({})", receiver, method, join(args)),
                }
            }
            Expr::TypeAssert { value, target } => write!(f, "{}.({})", value, target),
            Expr::MakeMap { key, value } => write!(f, "make(map[{}]{})", key, value),
            Expr::MakeSlice { element, capacity } => {
                write!(f, "make([]{}, 0, {})", element, capacity)
            }
            Expr::NotNil(value) => write!(f, "{} != nil", value),
            Expr::Not(value) => write!(f, "!{}", value),
            Expr::Composite(type_expr) => write!(f, "{}{{}}", type_expr),
            Expr::Str(value) => write!(f, "{:?}", value),
        }
    }
}

fn join(args: &[Expr]) -> String {
    args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
}

// =============================================================================
// Statements
// =============================================================================

/// `=` or `:=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Assign,
    Define,
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::Define => write!(f, ":="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// `lhs = rhs` / `lhs := rhs`
    Assign { lhs: Expr, op: AssignOp, rhs: Expr },
    /// `var name T`
    VarDecl { name: Expr, type_expr: TypeExpr },
    /// `value, err := call`
    AssignWithError { value: Expr, call: Expr },
    /// `if err != nil { return results..., err }`
    ReturnIfError { results: Vec<Expr> },
    /// `if check == nil { return results... }`
    ReturnIfNil { check: Expr, results: Vec<Expr> },
    If { condition: Expr, body: Vec<Stmt> },
    /// `for key, value := range source { body }`
    Range { key: Option<String>, value: String, source: Expr, body: Vec<Stmt> },
    /// `list = append(list, item)`
    Append { list: Expr, item: Expr },
    /// `map[key] = value`
    MapInsert { map: Expr, key: Expr, value: Expr },
    Return(Vec<Expr>),
    /// A bare expression, usually a call
    Expr(Expr),
}

impl Stmt {
    pub fn assign(lhs: Expr, op: AssignOp, rhs: Expr) -> Self {
        Stmt::Assign { lhs, op, rhs }
    }

    /// Visit this statement and every statement nested inside it
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Stmt)) {
        visit(self);
        match self {
            Stmt::If { body, .. } | Stmt::Range { body, .. } => {
                for stmt in body {
                    stmt.walk(visit);
                }
            }
            Stmt::Assign { .. }
            | Stmt::VarDecl { .. }
            | Stmt::AssignWithError { .. }
            | Stmt::ReturnIfError { .. }
            | Stmt::ReturnIfNil { .. }
            | Stmt::Append { .. }
            | Stmt::MapInsert { .. }
            | Stmt::Return(_)
            | Stmt::Expr(_) => {}
        }
    }
}

// =============================================================================
// Function Declarations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub type_expr: TypeExpr,
}

/// Receiver of a method declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receiver {
    pub ident: String,
    pub type_expr: TypeExpr,
}

/// A function declaration; methods carry a receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuncDecl {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Receiver>,
    pub parameters: Vec<Parameter>,
    pub returns: Vec<TypeExpr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    pub body: Vec<Stmt>,
}

impl FuncDecl {
    /// A free function
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            receiver: None,
            parameters: Vec::new(),
            returns: Vec::new(),
            comments: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn method(
        name: impl Into<String>,
        receiver_ident: impl Into<String>,
        receiver_type: TypeExpr,
    ) -> Self {
        Self {
            receiver: Some(Receiver { ident: receiver_ident.into(), type_expr: receiver_type }),
            ..Self::new(name)
        }
    }

    pub fn receiver_ident(&self) -> Option<&str> {
        self.receiver.as_ref().map(|r| r.ident.as_str())
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, type_expr: TypeExpr) {
        self.parameters.push(Parameter { name: name.into(), type_expr });
    }

    pub fn add_returns(&mut self, returns: impl IntoIterator<Item = TypeExpr>) {
        self.returns.extend(returns);
    }

    pub fn add_comments(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    /// Every statement in the body, depth first
    pub fn statements(&self) -> Vec<&Stmt> {
        let mut result = Vec::new();
        for stmt in &self.body {
            stmt.walk(&mut |s| result.push(s));
        }
        result
    }
}

/// An import line in a generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
}

// =============================================================================
// Builders
// =============================================================================

/// `if err != nil { return nil, err }`
pub fn check_error_and_return(results: Vec<Expr>) -> Stmt {
    Stmt::ReturnIfError { results }
}

/// `if check == nil { return results... }`
pub fn return_if_nil(check: Expr, results: Vec<Expr>) -> Stmt {
    Stmt::ReturnIfNil { check, results }
}

/// `list = append(list, item)`
pub fn append_list(list: Expr, item: Expr) -> Stmt {
    Stmt::Append { list, item }
}

/// `map[key] = value`
pub fn insert_map(map: Expr, key: Expr, value: Expr) -> Stmt {
    Stmt::MapInsert { map, key, value }
}

/// `var name T`
pub fn local_variable_declaration(name: Expr, type_expr: TypeExpr) -> Stmt {
    Stmt::VarDecl { name, type_expr }
}
