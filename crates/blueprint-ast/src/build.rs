//! Constructors for assembling programs in code.
//!
//! Embedders without a parser, and the test suites, build programs with these
//! helpers. Every node gets a synthetic span.
//!
//! ```
//! use blueprint_ast::build::*;
//!
//! let program = program(vec![
//!     model("Org", vec![
//!         field("name", "string").into(),
//!         relation("repos", "Repo", "org").into(),
//!     ]).into(),
//!     model("Repo", vec![reference("org", "Org").into()]).into(),
//! ]);
//! assert_eq!(program.models().count(), 2);
//! ```

use crate::ast::*;
use crate::foundation::{Span, Type};

pub fn ident(text: &str) -> Identifier {
    Identifier::new(text, Span::synthetic())
}

pub fn ident_ref(text: &str) -> IdentifierRef {
    IdentifierRef::new(ident(text))
}

/// Split `a.b.c` into unresolved segments.
pub fn path(dotted: &str) -> Vec<IdentifierRef> {
    dotted.split('.').map(ident_ref).collect()
}

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::synthetic())
}

pub fn int(value: i64) -> Expr {
    expr(ExprKind::Literal(Literal::Integer(value)))
}

pub fn float(value: f64) -> Expr {
    expr(ExprKind::Literal(Literal::Float(value)))
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::Literal(Literal::Boolean(value)))
}

pub fn string(value: &str) -> Expr {
    expr(ExprKind::Literal(Literal::String(value.to_string())))
}

pub fn null() -> Expr {
    expr(ExprKind::Literal(Literal::Null))
}

/// Identifier path expression, e.g. `var("org.owner.name")`.
pub fn var(dotted: &str) -> Expr {
    expr(ExprKind::Path(path(dotted)))
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn and(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::And, lhs, rhs)
}

pub fn or(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Or, lhs, rhs)
}

pub fn not(inner: Expr) -> Expr {
    expr(ExprKind::Unary {
        op: UnaryOp::Not,
        expr: Box::new(inner),
    })
}

pub fn group(inner: Expr) -> Expr {
    expr(ExprKind::Group(Box::new(inner)))
}

pub fn array(items: Vec<Expr>) -> Expr {
    expr(ExprKind::Array(items))
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Function {
        name: ident(name),
        args,
    })
}

pub fn model(name: &str, atoms: Vec<ModelAtom>) -> Model {
    Model {
        name: ident(name),
        atoms,
        span: Span::synthetic(),
    }
}

pub fn field(name: &str, type_name: &str) -> Field {
    Field {
        name: ident(name),
        type_name: ident(type_name),
        nullable: false,
        unique: false,
        default: None,
        validators: Vec::new(),
        span: Span::synthetic(),
        ty: Type::Unknown,
    }
}

impl Field {
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: Expr) -> Self {
        self.default = Some(value);
        self
    }

    pub fn validate(mut self, call: ValidatorCall) -> Self {
        self.validators.push(call);
        self
    }
}

pub fn reference(name: &str, to: &str) -> Reference {
    Reference {
        name: ident(name),
        to: ident_ref(to),
        nullable: false,
        unique: false,
        on_delete: None,
        span: Span::synthetic(),
    }
}

impl Reference {
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = Some(action);
        self
    }
}

pub fn relation(name: &str, from: &str, through: &str) -> Relation {
    Relation {
        name: ident(name),
        from: ident_ref(from),
        through: ident_ref(through),
        span: Span::synthetic(),
    }
}

pub fn query(name: &str, atoms: Vec<QueryAtom>) -> Query {
    Query {
        name: ident(name),
        atoms,
        span: Span::synthetic(),
        ty: Type::Unknown,
    }
}

/// `from a.b.c` with an optional `as x.y.z`.
pub fn from(dotted: &str, alias: Option<&str>) -> QueryAtom {
    QueryAtom::From {
        path: path(dotted),
        alias: alias.map(|a| a.split('.').map(ident).collect()),
        span: Span::synthetic(),
    }
}

pub fn filter(condition: Expr) -> QueryAtom {
    QueryAtom::Filter {
        expr: condition,
        span: Span::synthetic(),
    }
}

pub fn order_by(items: &[(&str, SortOrder)]) -> QueryAtom {
    QueryAtom::OrderBy {
        items: items.iter().map(|(p, o)| order_item(p, *o)).collect(),
        span: Span::synthetic(),
    }
}

pub fn order_item(dotted: &str, order: SortOrder) -> OrderBy {
    OrderBy {
        path: path(dotted),
        order: Some(order),
        span: Span::synthetic(),
    }
}

pub fn limit(value: i64) -> QueryAtom {
    QueryAtom::Limit {
        value,
        span: Span::synthetic(),
    }
}

pub fn offset(value: i64) -> QueryAtom {
    QueryAtom::Offset {
        value,
        span: Span::synthetic(),
    }
}

pub fn aggregate(aggregate: AggregateKind) -> QueryAtom {
    QueryAtom::Aggregate {
        aggregate,
        span: Span::synthetic(),
    }
}

pub fn select(items: Vec<SelectItem>) -> Select {
    Select {
        items,
        span: Span::synthetic(),
    }
}

pub fn select_item(name: &str) -> SelectItem {
    SelectItem {
        alias: None,
        target: ident_ref(name),
        select: None,
        span: Span::synthetic(),
    }
}

impl SelectItem {
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(ident(alias));
        self
    }

    pub fn nested(mut self, nested: Select) -> Self {
        self.select = Some(nested);
        self
    }
}

pub fn computed(name: &str, value: Expr) -> Computed {
    Computed {
        name: ident(name),
        expr: value,
        span: Span::synthetic(),
    }
}

pub fn model_hook(name: &str, hook: Hook) -> ModelHook {
    ModelHook {
        name: ident(name),
        hook,
        span: Span::synthetic(),
    }
}

pub fn inline_hook(code: &str) -> Hook {
    Hook {
        args: Vec::new(),
        source: None,
        inline: Some(code.to_string()),
        runtime: None,
        span: Span::synthetic(),
    }
}

pub fn source_hook(target: &str, file: &str) -> Hook {
    Hook {
        args: Vec::new(),
        source: Some(HookSource {
            target: ident(target),
            file: file.to_string(),
        }),
        inline: None,
        runtime: None,
        span: Span::synthetic(),
    }
}

impl Hook {
    pub fn arg(mut self, name: &str, value: Expr) -> Self {
        self.args.push(HookArg {
            name: ident(name),
            expr: value,
        });
        self
    }

    pub fn runtime(mut self, name: &str) -> Self {
        self.runtime = Some(ident_ref(name));
        self
    }
}

pub fn validator_call(name: &str, args: Vec<Expr>) -> ValidatorCall {
    ValidatorCall {
        validator: ident_ref(name),
        args,
        span: Span::synthetic(),
    }
}

/// Custom validator with an expression assertion.
pub fn validator(name: &str, args: &[(&str, &str)], assert: Expr, error_code: &str) -> Validator {
    Validator {
        name: ident(name),
        args: args
            .iter()
            .map(|(arg, ty)| ValidatorArg {
                name: ident(arg),
                type_name: ident(ty),
                span: Span::synthetic(),
            })
            .collect(),
        assert: Some(ValidatorAssert::Expr(assert)),
        error_code: Some(error_code.to_string()),
        span: Span::synthetic(),
    }
}

pub fn api(name: Option<&str>, entrypoints: Vec<Entrypoint>) -> Api {
    Api {
        name: name.map(ident),
        entrypoints,
        span: Span::synthetic(),
    }
}

pub fn entrypoint(target: &str) -> Entrypoint {
    Entrypoint {
        target: ident_ref(target),
        alias: None,
        identify_through: None,
        response: None,
        authorize: None,
        endpoints: Vec::new(),
        entrypoints: Vec::new(),
        span: Span::synthetic(),
    }
}

impl Entrypoint {
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(ident(alias));
        self
    }

    pub fn identify_through(mut self, field: &str) -> Self {
        self.identify_through = Some(ident_ref(field));
        self
    }

    pub fn response(mut self, response: Select) -> Self {
        self.response = Some(response);
        self
    }

    pub fn authorize(mut self, condition: Expr) -> Self {
        self.authorize = Some(condition);
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn entrypoint(mut self, nested: Entrypoint) -> Self {
        self.entrypoints.push(nested);
        self
    }
}

pub fn endpoint(kind: EndpointKind) -> Endpoint {
    Endpoint {
        kind,
        actions: Vec::new(),
        authorize: None,
        pageable: false,
        filter: None,
        order_by: Vec::new(),
        span: Span::synthetic(),
    }
}

pub fn custom(cardinality: EndpointCardinality, method: HttpMethod, path: &str) -> EndpointKind {
    EndpointKind::Custom {
        cardinality,
        method,
        path: path.to_string(),
    }
}

impl Endpoint {
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn authorize(mut self, condition: Expr) -> Self {
        self.authorize = Some(condition);
        self
    }

    pub fn pageable(mut self) -> Self {
        self.pageable = true;
        self
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        self.filter = Some(condition);
        self
    }

    pub fn order_by(mut self, item: OrderBy) -> Self {
        self.order_by.push(item);
        self
    }
}

fn model_action(target: Option<&str>, alias: Option<&str>, atoms: Vec<ActionAtom>) -> ModelAction {
    ModelAction {
        target: target.map(path),
        alias: alias.map(ident),
        atoms,
        span: Span::synthetic(),
    }
}

pub fn create(target: Option<&str>, alias: Option<&str>, atoms: Vec<ActionAtom>) -> Action {
    Action::Create(model_action(target, alias, atoms))
}

pub fn update(target: Option<&str>, alias: Option<&str>, atoms: Vec<ActionAtom>) -> Action {
    Action::Update(model_action(target, alias, atoms))
}

pub fn delete(target: Option<&str>) -> Action {
    Action::Delete(DeleteAction {
        target: target.map(path),
        span: Span::synthetic(),
    })
}

pub fn execute(alias: Option<&str>, hook: Hook, responds: bool) -> Action {
    Action::Execute(ExecuteAction {
        alias: alias.map(ident),
        hook,
        responds,
        span: Span::synthetic(),
    })
}

pub fn query_action(alias: &str, atoms: Vec<QueryAtom>) -> Action {
    Action::Query(QueryAction {
        alias: ident(alias),
        atoms,
        span: Span::synthetic(),
        ty: Type::Unknown,
    })
}

pub fn validate(key: &str, condition: Expr) -> Action {
    Action::Validate(ValidateAction {
        key: key.to_string(),
        expr: condition,
        span: Span::synthetic(),
    })
}

pub fn respond(body: Expr, http_status: Option<Expr>) -> Action {
    Action::Respond(RespondAction {
        body,
        http_status,
        span: Span::synthetic(),
    })
}

pub fn set(target: &str, value: Expr) -> ActionAtom {
    ActionAtom::Set {
        target: ident_ref(target),
        value: SetValue::Expr(value),
        span: Span::synthetic(),
    }
}

pub fn set_hook(target: &str, hook: Hook) -> ActionAtom {
    ActionAtom::Set {
        target: ident_ref(target),
        value: SetValue::Hook(hook),
        span: Span::synthetic(),
    }
}

pub fn reference_through(target: &str, through: &str) -> ActionAtom {
    ActionAtom::ReferenceThrough {
        target: ident_ref(target),
        through: ident_ref(through),
        span: Span::synthetic(),
    }
}

pub fn deny(fields: &[&str]) -> ActionAtom {
    ActionAtom::Deny {
        fields: DenyFields::Fields(fields.iter().map(|f| ident_ref(f)).collect()),
        span: Span::synthetic(),
    }
}

pub fn deny_all() -> ActionAtom {
    ActionAtom::Deny {
        fields: DenyFields::All,
        span: Span::synthetic(),
    }
}

/// `input { a, b }` with plain required fields.
pub fn input(fields: &[&str]) -> ActionAtom {
    inputs(fields.iter().map(|f| input_field(f)).collect())
}

pub fn inputs(fields: Vec<InputField>) -> ActionAtom {
    ActionAtom::Input {
        fields,
        span: Span::synthetic(),
    }
}

pub fn input_field(name: &str) -> InputField {
    InputField {
        field: ident_ref(name),
        optional: false,
        default: None,
        span: Span::synthetic(),
    }
}

impl InputField {
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: Expr) -> Self {
        self.default = Some(value);
        self
    }
}

pub fn virtual_input(name: &str, type_name: &str) -> VirtualInput {
    VirtualInput {
        name: ident(name),
        type_name: ident(type_name),
        nullable: false,
        validators: Vec::new(),
        span: Span::synthetic(),
        ty: Type::Unknown,
    }
}

impl VirtualInput {
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn validate(mut self, call: ValidatorCall) -> Self {
        self.validators.push(call);
        self
    }
}

pub fn populator(name: &str, populates: Vec<Populate>) -> Populator {
    Populator {
        name: ident(name),
        populates,
        span: Span::synthetic(),
    }
}

pub fn populate(target: &str, alias: Option<&str>) -> Populate {
    Populate {
        target: ident_ref(target),
        alias: alias.map(ident),
        repeater: None,
        atoms: Vec::new(),
        populates: Vec::new(),
        span: Span::synthetic(),
    }
}

impl Populate {
    pub fn repeat(mut self, alias: Option<&str>, kind: RepeaterKind) -> Self {
        self.repeater = Some(Repeater {
            alias: alias.map(ident),
            kind,
            span: Span::synthetic(),
        });
        self
    }

    pub fn atom(mut self, atom: ActionAtom) -> Self {
        self.atoms.push(atom);
        self
    }

    pub fn populate(mut self, nested: Populate) -> Self {
        self.populates.push(nested);
        self
    }
}

pub fn runtime(name: &str) -> Runtime {
    Runtime {
        name: ident(name),
        default: false,
        source_path: None,
        span: Span::synthetic(),
    }
}

impl Runtime {
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn source_path(mut self, dir: &str) -> Self {
        self.source_path = Some(dir.to_string());
        self
    }
}

pub fn auth(model: &str) -> Authenticator {
    Authenticator {
        model: ident_ref(model),
        method: AuthMethod::Basic,
        span: Span::synthetic(),
    }
}

pub fn program(globals: Vec<GlobalAtom>) -> Program {
    Program { globals }
}

macro_rules! into_variant {
    ($target:ident, $($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for $target {
                fn from(value: $ty) -> Self {
                    $target::$variant(value)
                }
            }
        )*
    };
}

into_variant!(ModelAtom,
    Field => Field,
    Reference => Reference,
    Relation => Relation,
    Query => Query,
    Computed => Computed,
    ModelHook => Hook,
);

into_variant!(GlobalAtom,
    Model => Model,
    Validator => Validator,
    Api => Api,
    Populator => Populator,
    Runtime => Runtime,
    Authenticator => Auth,
    Generator => Generator,
);

into_variant!(ActionAtom, VirtualInput => VirtualInput);

impl From<Select> for QueryAtom {
    fn from(value: Select) -> Self {
        QueryAtom::Select(value)
    }
}
