//! Syntax tree node types
//!
//! Scripts arrive as ESTree-shaped JSON produced by the parser: every node is an
//! object with a `"type"` discriminator, kind-specific fields and an optional
//! `"loc"` block. Only the fields the compiler consumes are modeled; anything
//! else in the JSON is ignored.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Line/column position (1-based line, 0-based column, as emitted by ESTree parsers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Source location attached to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceLocation {
    pub start: Position,
    #[serde(default)]
    pub end: Position,
}

/// A syntax tree node: its kind plus optional location metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLocation>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, loc: None }
    }

    /// Decode a node (usually a `Program`) from parser JSON
    pub fn from_json(source: &str) -> Result<Node> {
        Ok(serde_json::from_str(source)?)
    }

    /// Start line and column, when the parser recorded them
    pub fn position(&self) -> Option<Position> {
        self.loc.map(|loc| loc.start)
    }

    /// Name of an `Identifier` node
    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }
}

/// `catch (param) { body }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Option<Box<Node>>,
    pub body: Box<Node>,
}

/// One `case test:` (or `default:` when `test` is absent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub test: Option<Node>,
    pub consequent: Vec<Node>,
}

/// `id = init` inside a variable declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclarator {
    pub id: Node,
    pub init: Option<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateValue {
    pub cooked: Option<String>,
    pub raw: String,
}

/// Static string chunk of a template literal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateElement {
    pub value: TemplateValue,
    #[serde(default)]
    pub tail: bool,
}

fn default_property_kind() -> String {
    "init".to_string()
}

fn default_declaration_kind() -> String {
    "var".to_string()
}

/// Node kinds understood by the compiler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /* ===================== Programs & Statements ===================== */
    Program {
        body: Vec<Node>,
    },
    BlockStatement {
        body: Vec<Node>,
    },
    EmptyStatement,
    ExpressionStatement {
        expression: Box<Node>,
    },
    ReturnStatement {
        argument: Option<Box<Node>>,
    },
    IfStatement {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },
    ForStatement {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    WhileStatement {
        test: Box<Node>,
        body: Box<Node>,
    },
    DoWhileStatement {
        body: Box<Node>,
        test: Box<Node>,
    },
    ForInStatement {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
    },
    ForOfStatement {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
    },
    WithStatement {
        object: Box<Node>,
        body: Box<Node>,
    },
    ThrowStatement {
        argument: Box<Node>,
    },
    TryStatement {
        block: Box<Node>,
        handler: Option<CatchClause>,
        finalizer: Option<Box<Node>>,
    },
    BreakStatement {
        #[serde(default)]
        label: Option<Box<Node>>,
    },
    ContinueStatement {
        #[serde(default)]
        label: Option<Box<Node>>,
    },
    SwitchStatement {
        discriminant: Box<Node>,
        cases: Vec<SwitchCase>,
    },
    VariableDeclaration {
        declarations: Vec<VariableDeclarator>,
        #[serde(default = "default_declaration_kind")]
        kind: String,
    },
    FunctionDeclaration {
        id: Option<Box<Node>>,
        params: Vec<Node>,
        body: Box<Node>,
    },

    /* ===================== Expressions ===================== */
    Identifier {
        name: String,
    },
    Literal {
        #[serde(default)]
        value: serde_json::Value,
    },
    TemplateLiteral {
        quasis: Vec<TemplateElement>,
        expressions: Vec<Node>,
    },
    ThisExpression,
    ArrayExpression {
        elements: Vec<Option<Node>>,
    },
    ObjectExpression {
        properties: Vec<Node>,
    },
    Property {
        key: Box<Node>,
        value: Box<Node>,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        shorthand: bool,
        #[serde(default)]
        method: bool,
        #[serde(default = "default_property_kind")]
        kind: String,
    },
    SpreadElement {
        argument: Box<Node>,
    },
    FunctionExpression {
        id: Option<Box<Node>>,
        params: Vec<Node>,
        body: Box<Node>,
    },
    ArrowFunctionExpression {
        params: Vec<Node>,
        body: Box<Node>,
        #[serde(default)]
        expression: bool,
    },
    UnaryExpression {
        operator: String,
        argument: Box<Node>,
        #[serde(default)]
        prefix: bool,
    },
    UpdateExpression {
        operator: String,
        argument: Box<Node>,
        #[serde(default)]
        prefix: bool,
    },
    BinaryExpression {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    LogicalExpression {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    AssignmentExpression {
        operator: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    ConditionalExpression {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
        #[serde(default)]
        optional: bool,
    },
    NewExpression {
        callee: Box<Node>,
        #[serde(default)]
        arguments: Vec<Node>,
    },
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        optional: bool,
    },
    ChainExpression {
        expression: Box<Node>,
    },
    SequenceExpression {
        expressions: Vec<Node>,
    },

    /* ===================== Patterns ===================== */
    ObjectPattern {
        properties: Vec<Node>,
    },
    ArrayPattern {
        elements: Vec<Option<Node>>,
    },
    AssignmentPattern {
        left: Box<Node>,
        right: Box<Node>,
    },
    RestElement {
        argument: Box<Node>,
    },

    /// Any node type the compiler does not know about
    #[serde(other)]
    Unsupported,
}

impl NodeKind {
    /// ESTree type name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::EmptyStatement => "EmptyStatement",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::DoWhileStatement { .. } => "DoWhileStatement",
            NodeKind::ForInStatement { .. } => "ForInStatement",
            NodeKind::ForOfStatement { .. } => "ForOfStatement",
            NodeKind::WithStatement { .. } => "WithStatement",
            NodeKind::ThrowStatement { .. } => "ThrowStatement",
            NodeKind::TryStatement { .. } => "TryStatement",
            NodeKind::BreakStatement { .. } => "BreakStatement",
            NodeKind::ContinueStatement { .. } => "ContinueStatement",
            NodeKind::SwitchStatement { .. } => "SwitchStatement",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::TemplateLiteral { .. } => "TemplateLiteral",
            NodeKind::ThisExpression => "ThisExpression",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::ObjectExpression { .. } => "ObjectExpression",
            NodeKind::Property { .. } => "Property",
            NodeKind::SpreadElement { .. } => "SpreadElement",
            NodeKind::FunctionExpression { .. } => "FunctionExpression",
            NodeKind::ArrowFunctionExpression { .. } => "ArrowFunctionExpression",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::UpdateExpression { .. } => "UpdateExpression",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::LogicalExpression { .. } => "LogicalExpression",
            NodeKind::AssignmentExpression { .. } => "AssignmentExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::NewExpression { .. } => "NewExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::ChainExpression { .. } => "ChainExpression",
            NodeKind::SequenceExpression { .. } => "SequenceExpression",
            NodeKind::ObjectPattern { .. } => "ObjectPattern",
            NodeKind::ArrayPattern { .. } => "ArrayPattern",
            NodeKind::AssignmentPattern { .. } => "AssignmentPattern",
            NodeKind::RestElement { .. } => "RestElement",
            NodeKind::Unsupported => "Unsupported",
        }
    }
}
