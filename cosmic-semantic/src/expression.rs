use cosmic_core::Location;
use cosmic_registry::{FunctionDefinition, MemberKind};
use cosmic_syntax::*;
use cosmic_token::{Literal, Operator};

use crate::SemanticAnalyzer;
use crate::hover::{Hoverable, code_block, describe_variable};
use crate::member::Member;
use crate::scope::VariableKind;
use crate::types::{Signature, Type};

fn builtin_signature(function: &FunctionDefinition) -> Signature {
    Signature {
        params: Some(
            function
                .params
                .iter()
                .map(|param| Type::from_registry(&param.ty))
                .collect(),
        ),
        variadic: function.variadic,
        returns: Box::new(Type::from_registry(&function.returns)),
    }
}

fn arithmetic(lhs: &Type, rhs: &Type) -> Option<Type> {
    match (lhs, rhs) {
        (Type::Int, Type::Int) => Some(Type::Int),
        (lhs, rhs) if lhs.is_numeric() && rhs.is_numeric() => Some(Type::Float),
        _ => None,
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

impl SemanticAnalyzer<'_> {
    pub(crate) fn analyze_expression(&mut self, expr: &Expr) -> Type {
        match expr {
            // malformed input is reported once, by the parser
            Expr::Error(_) => Type::Unknown,
            Expr::String(_) => Type::String,
            Expr::Primitive(primitive) => match primitive.value {
                Literal::Int(_) => Type::Int,
                Literal::Float(_) => Type::Float,
                Literal::String => Type::String,
                Literal::Bool(_) => Type::Bool,
                Literal::Null => Type::Null,
            },
            Expr::Ident(location) => self.resolve_identifier(*location),
            Expr::List(list) => self.analyze_list(list),
            Expr::Unary(unary) => self.analyze_unary(unary),
            Expr::Binary(binary) => {
                let lhs = self.analyze_expression(&binary.lhs);
                let rhs = self.analyze_expression(&binary.rhs);
                self.binary_result(binary.op, &lhs, &rhs, binary.location)
            }
            Expr::Assign(assign) => self.analyze_assign(assign),
            Expr::Call(call) => self.analyze_call(call),
            Expr::Member(member) => self.analyze_member(member),
            Expr::ArrayIndex(index) => self.analyze_index(index),
        }
    }

    fn resolve_identifier(&mut self, location: Location) -> Type {
        let name = self.text(location);

        if let Some(found) = self.lookup(name) {
            let variable = self.variable_mut(found);
            variable.references += 1;
            let ty = variable.ty.clone();
            let message = describe_variable(variable);
            self.hoverables.push(Hoverable::new(location, message));
            return ty;
        }

        let registry = self.registry;
        if let Some(function) = registry.get_function(name) {
            let signature = builtin_signature(function);
            let message = code_block(
                &format!("fn {name}{signature}"),
                function.documentation.as_deref(),
            );
            self.hoverables.push(Hoverable::new(location, message));
            return Type::Function(signature);
        }

        if let Some(definition) = registry.get_struct(name) {
            let message = code_block(
                &format!("struct {name}"),
                definition.documentation.as_deref(),
            );
            self.hoverables.push(Hoverable::new(location, message));
            return Type::StructName(name.to_string());
        }

        self.error(location, format!("cannot find `{name}` in this scope"));
        Type::Unknown
    }

    fn analyze_list(&mut self, list: &List) -> Type {
        let mut item_type = Type::Unknown;

        for item in list.items.iter() {
            let ty = self.analyze_expression(item);
            if item_type.is_unknown() {
                item_type = ty;
            } else if item_type == Type::Int && ty == Type::Float {
                item_type = Type::Float;
            } else if !item_type.accepts(&ty) {
                self.mismatch(item.location(), &item_type, &ty);
            }
        }

        Type::List(Box::new(item_type))
    }

    fn analyze_unary(&mut self, unary: &Unary) -> Type {
        let ty = self.analyze_expression(&unary.expr);

        match (unary.op, &ty) {
            (_, Type::Unknown) => Type::Unknown,
            (Operator::Not, Type::Bool) => Type::Bool,
            (Operator::Minus, Type::Int | Type::Float) => ty.clone(),
            (op, _) => {
                self.error(
                    unary.location,
                    format!("cannot apply unary `{}` to `{ty}`", op.as_str()),
                );
                Type::Unknown
            }
        }
    }

    pub(crate) fn binary_result(
        &mut self,
        op: Operator,
        lhs: &Type,
        rhs: &Type,
        location: Location,
    ) -> Type {
        let comparison = matches!(
            op,
            Operator::EqualEqual
                | Operator::NotEqual
                | Operator::LessThan
                | Operator::LessThanOrEqual
                | Operator::GreaterThan
                | Operator::GreaterThanOrEqual
                | Operator::And
                | Operator::Or
        );

        if lhs.is_unknown() || rhs.is_unknown() {
            return if comparison { Type::Bool } else { Type::Unknown };
        }

        let result = match op {
            Operator::Plus if *lhs == Type::String && *rhs == Type::String => Some(Type::String),
            Operator::Plus | Operator::Minus | Operator::Mul | Operator::Div | Operator::Mod => {
                arithmetic(lhs, rhs)
            }
            Operator::LessThan
            | Operator::LessThanOrEqual
            | Operator::GreaterThan
            | Operator::GreaterThanOrEqual => {
                (lhs.is_numeric() && rhs.is_numeric()).then_some(Type::Bool)
            }
            Operator::EqualEqual | Operator::NotEqual => Some(Type::Bool),
            Operator::And | Operator::Or => {
                (*lhs == Type::Bool && *rhs == Type::Bool).then_some(Type::Bool)
            }
            _ => None,
        };

        result.unwrap_or_else(|| {
            self.error(
                location,
                format!("cannot apply `{}` to `{lhs}` and `{rhs}`", op.as_str()),
            );
            Type::Unknown
        })
    }

    fn analyze_assign(&mut self, assign: &Assign) -> Type {
        let target = self.analyze_target(&assign.target);
        let value = self.analyze_expression(&assign.value);

        let Some(target) = target else {
            return Type::Unknown;
        };

        let stored = match assign.op.compound_base() {
            Some(op) => self.binary_result(op, &target, &value, assign.location),
            None => value,
        };

        if !target.accepts(&stored) {
            self.mismatch(assign.value.location(), &target, &stored);
        }

        target
    }

    /// Type of an assignment target, or `None` when nothing can be stored there.
    fn analyze_target(&mut self, target: &Expr) -> Option<Type> {
        match target {
            Expr::Ident(location) => {
                let ty = self.analyze_expression(target);
                let name = self.text(*location);

                let constant = match self.lookup(name) {
                    Some(found) => matches!(
                        self.variable_mut(found).kind,
                        VariableKind::Function | VariableKind::Struct
                    ),
                    // resolved to a builtin
                    None => !ty.is_unknown(),
                };

                if constant {
                    self.error(*location, format!("cannot assign to `{name}`"));
                    return None;
                }
                Some(ty)
            }
            Expr::Member(member) if member.member.is_some() => Some(self.analyze_expression(target)),
            Expr::ArrayIndex(_) => Some(self.analyze_expression(target)),
            Expr::Error(_) => None,
            _ => {
                self.analyze_expression(target);
                self.error(target.location(), "invalid left-hand side of assignment");
                None
            }
        }
    }

    fn analyze_call(&mut self, call: &Call) -> Type {
        let callee = self.analyze_expression(&call.fun);
        let args = call
            .args
            .iter()
            .map(|arg| (arg.location(), self.analyze_expression(arg)))
            .collect::<Vec<_>>();

        match callee {
            Type::Unknown => Type::Unknown,
            Type::Function(signature) => {
                if let Some(params) = signature.params.as_deref() {
                    self.check_arguments(call.location, params, signature.variadic, &args);
                }
                *signature.returns
            }
            Type::StructName(name) => {
                // only document structs describe their constructor
                if self.registry.get_struct(&name).is_none()
                    && let Some(fields) = self.struct_fields(&name)
                {
                    let params = fields.iter().map(|(_, ty)| ty.clone()).collect::<Vec<_>>();
                    self.check_arguments(call.location, &params, false, &args);
                }
                Type::Struct(name)
            }
            other => {
                self.error(call.fun.location(), format!("`{other}` is not callable"));
                Type::Unknown
            }
        }
    }

    fn check_arguments(
        &mut self,
        location: Location,
        params: &[Type],
        variadic: bool,
        args: &[(Location, Type)],
    ) {
        let (fits, expected) = if variadic {
            let required = params.len().saturating_sub(1);
            (args.len() >= required, format!("at least {required}"))
        } else {
            (args.len() == params.len(), params.len().to_string())
        };

        if !fits {
            let count = if variadic { params.len().saturating_sub(1) } else { params.len() };
            self.error(
                location,
                format!(
                    "expected {expected} argument{}, found {}",
                    plural(count),
                    args.len()
                ),
            );
            return;
        }

        for (index, (location, found)) in args.iter().enumerate() {
            let expected = match params.get(index) {
                Some(param) => param,
                None => match params.last() {
                    Some(last) if variadic => last,
                    _ => continue,
                },
            };

            if !expected.accepts(found) {
                self.mismatch(*location, expected, found);
            }
        }
    }

    fn members_of(&self, owner: &str) -> Option<Vec<Member>> {
        if let Some(definition) = self.registry.get_struct(owner) {
            return Some(definition.members.iter().map(Member::from).collect());
        }

        let fields = self.struct_fields(owner)?;
        Some(
            fields
                .iter()
                .map(|(name, ty)| Member::property(name.as_str(), ty.to_string()))
                .collect(),
        )
    }

    fn member_type(&self, owner: &str, member: &Member) -> Type {
        if self.registry.get_struct(owner).is_none() {
            return self
                .struct_fields(owner)
                .and_then(|fields| fields.iter().find(|(name, _)| *name == member.name))
                .map(|(_, ty)| ty.clone())
                .unwrap_or(Type::Unknown);
        }

        let ty = Type::from_registry(member.ty.as_deref().unwrap_or("any"));
        match member.kind {
            MemberKind::Property => ty,
            MemberKind::Method | MemberKind::StaticMethod => Type::Function(Signature {
                params: None,
                variadic: false,
                returns: Box::new(ty),
            }),
        }
    }

    fn analyze_member(&mut self, access: &MemberAccess) -> Type {
        let object = self.analyze_expression(&access.object);

        let Some(owner) = object.struct_name().map(str::to_string) else {
            if let Some(name) = access.member
                && !object.is_unknown()
            {
                let message = format!("`{object}` has no member `{}`", self.text(name));
                self.error(name, message);
            }
            return Type::Unknown;
        };

        let Some(members) = self.members_of(&owner) else {
            return Type::Unknown;
        };

        let around_cursor = self.cursor.is_none_or(|cursor| {
            access.dot.start_byte <= cursor && cursor <= access.location.end_byte
        });
        if around_cursor {
            self.use_member = true;
            self.members = members.clone();
        }

        let Some(name_location) = access.member else {
            return Type::Unknown;
        };
        let name = self.text(name_location);

        let Some(member) = members.iter().find(|member| member.name == name) else {
            self.error(name_location, format!("no member `{name}` on `{owner}`"));
            return Type::Unknown;
        };

        let message = code_block(&member.detail(&owner), member.documentation.as_deref());
        self.hoverables
            .push(Hoverable::new(name_location, message));
        self.member_type(&owner, member)
    }

    fn analyze_index(&mut self, index: &ArrayIndex) -> Type {
        let collection = self.analyze_expression(&index.lhs);
        let position = self.analyze_expression(&index.index);

        if !Type::Int.accepts(&position) {
            self.mismatch(index.index.location(), &Type::Int, &position);
        }

        match collection {
            Type::List(item) => *item,
            Type::String => Type::String,
            Type::Unknown => Type::Unknown,
            other => {
                self.error(
                    index.lhs.location(),
                    format!("cannot index into a value of type `{other}`"),
                );
                Type::Unknown
            }
        }
    }
}
