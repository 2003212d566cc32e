// src/models.rs

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::core::params::{ParamValue, ParseError};

// --- COMMAND NAME NORMALIZATION ---

/// Converts a dash-case command name into its method identifier.
///
/// The transform splits on `-`, discards empty segments, upper-cases the
/// first character of each segment and lower-cases the remainder, then
/// concatenates: `create-admin` becomes `CreateAdmin`. It is total and
/// deterministic for any input string.
pub fn dash_case_to_pascal_case(input: &str) -> String {
    input
        .split('-')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

// --- BOUND VALUES ---

/// A handler-group instance produced by the service provider.
///
/// Instances are type-erased at the provider boundary and downcast back to
/// the concrete bag type by the invoke closure built at registration time.
pub type BagInstance = Box<dyn Any + Send>;

/// One typed value bound to one declared parameter.
///
/// Produced by a parameter parser (or a declared default) during argument
/// binding, and taken back out by the operation's invoke closure.
pub struct BoundValue(Box<dyn Any + Send>);

impl BoundValue {
    /// Wraps a typed value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Recovers the typed value. Fails if `T` is not the type that was
    /// bound, which indicates a mismatch between a parameter declaration
    /// and its handler signature.
    pub fn take<T: Any>(self) -> Result<T> {
        self.0
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| anyhow!("bound value is not of type {}", std::any::type_name::<T>()))
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoundValue(..)")
    }
}

// --- COMPLETION ---

/// The awaited half of a deferred operation.
pub type OpFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The uniform return shape of every registered operation.
///
/// Synchronous handlers are wrapped into `Ready` and asynchronous handlers
/// into `Deferred` when the bag is built, so dispatch never inspects the
/// handler's own return type.
pub enum Completion {
    /// The operation finished before returning control.
    Ready(Result<()>),
    /// The operation handed back work that must be awaited.
    Deferred(OpFuture),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

// --- PARAMETER SPECS ---

type ParserFn = Arc<dyn Fn(&str) -> Result<BoundValue, ParseError> + Send + Sync>;
type DefaultFn = Arc<dyn Fn() -> BoundValue + Send + Sync>;

/// One declared parameter of an operation: its name, target type, parser,
/// and optional default value.
pub struct ParamSpec {
    name: &'static str,
    type_name: &'static str,
    parser: ParserFn,
    default: Option<DefaultFn>,
}

impl ParamSpec {
    /// Declares a required parameter of type `T`.
    pub fn required<T: ParamValue>(name: &'static str) -> Self {
        Self {
            name,
            type_name: T::type_name(),
            parser: Arc::new(|raw| T::parse(raw).map(BoundValue::new)),
            default: None,
        }
    }

    /// Declares a parameter of type `T` with a default used verbatim when
    /// no positional token is supplied. The default never passes through a
    /// parser.
    pub fn with_default<T>(name: &'static str, default: T) -> Self
    where
        T: ParamValue + Clone + Sync,
    {
        Self {
            name,
            type_name: T::type_name(),
            parser: Arc::new(|raw| T::parse(raw).map(BoundValue::new)),
            default: Some(Arc::new(move || BoundValue::new(default.clone()))),
        }
    }

    /// The declared parameter name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The target type's display name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether a default value was declared.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn parse(&self, raw: &str) -> Result<BoundValue, ParseError> {
        (self.parser)(raw)
    }

    pub(crate) fn default_value(&self) -> Option<BoundValue> {
        self.default.as_ref().map(|produce| produce())
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

// --- ARGUMENT EXTRACTION ---

/// Conversion from a bound argument list into a handler's typed argument
/// tuple. Implemented for tuples up to six elements; the unit type accepts
/// operations without parameters.
pub trait FromBoundArgs: Sized {
    /// Number of values the implementor consumes. Checked against the
    /// declared parameter list when the operation is registered.
    const ARITY: usize;

    /// Consumes the bound list, recovering each typed value in order.
    fn from_bound(values: Vec<BoundValue>) -> Result<Self>;
}

impl FromBoundArgs for () {
    const ARITY: usize = 0;

    fn from_bound(_values: Vec<BoundValue>) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_from_bound_args {
    ($arity:expr, $( $ty:ident ),+) => {
        impl<$( $ty: Any ),+> FromBoundArgs for ($( $ty, )+) {
            const ARITY: usize = $arity;

            fn from_bound(values: Vec<BoundValue>) -> Result<Self> {
                if values.len() != $arity {
                    return Err(anyhow!(
                        "operation binds {} arguments but received {}",
                        $arity,
                        values.len()
                    ));
                }
                let mut values = values.into_iter();
                Ok(($(
                    values
                        .next()
                        .ok_or_else(|| anyhow!("bound argument list exhausted"))?
                        .take::<$ty>()?,
                )+))
            }
        }
    };
}

impl_from_bound_args!(1, A1);
impl_from_bound_args!(2, A1, A2);
impl_from_bound_args!(3, A1, A2, A3);
impl_from_bound_args!(4, A1, A2, A3, A4);
impl_from_bound_args!(5, A1, A2, A3, A4, A5);
impl_from_bound_args!(6, A1, A2, A3, A4, A5, A6);

// --- OPERATION AND BAG SPECS ---

type InvokeFn = Arc<dyn Fn(BagInstance, Vec<BoundValue>) -> Completion + Send + Sync>;

/// One dispatchable operation: its dash-case command name, the method
/// identifier it resolves under, its declared parameters, and the invoke
/// closure produced at registration.
pub struct OperationSpec {
    command: String,
    method: String,
    params: Vec<ParamSpec>,
    invoke: InvokeFn,
}

impl OperationSpec {
    /// The dash-case command name as registered.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The normalized method identifier this operation resolves under.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The declared parameters, in binding order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn call(&self, instance: BagInstance, values: Vec<BoundValue>) -> Completion {
        (self.invoke)(instance, values)
    }
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("command", &self.command)
            .field("method", &self.method)
            .field("params", &self.params)
            .finish()
    }
}

/// A command bag: the handler-group type's identity plus its operation
/// table, keyed by method identifier. Built once at startup via
/// [`BagSpec::builder`], read-only afterwards.
pub struct BagSpec {
    type_name: &'static str,
    type_id: TypeId,
    operations: HashMap<String, OperationSpec>,
}

impl BagSpec {
    /// Starts declaring operations for the bag type `B`.
    pub fn builder<B: Any + Send>() -> BagBuilder<B> {
        BagBuilder {
            operations: HashMap::new(),
            _bag: PhantomData,
        }
    }

    /// The bag type's display name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The bag type's identity, used to request an instance from the
    /// service provider.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Looks up an operation by its exact method identifier. There is no
    /// fuzzy matching: a dispatch resolves if and only if one operation
    /// carries exactly this name.
    pub fn operation(&self, method: &str) -> Option<&OperationSpec> {
        self.operations.get(method)
    }

    /// Iterates over all declared operations, in no particular order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.values()
    }
}

impl fmt::Debug for BagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BagSpec")
            .field("type_name", &self.type_name)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Declares the operations of a bag type `B`, erasing each typed handler
/// into the uniform invoke shape. Both synchronous and asynchronous
/// handlers take the bag by value: an instance is created for a single
/// dispatch and consumed by it.
pub struct BagBuilder<B> {
    operations: HashMap<String, OperationSpec>,
    _bag: PhantomData<B>,
}

impl<B: Any + Send> BagBuilder<B> {
    /// Declares a synchronous operation.
    ///
    /// `command` is the dash-case name the operation dispatches under.
    /// Asserts at construction time that the handler's argument tuple
    /// matches the declared parameter count and that the command is not
    /// already declared on this bag.
    pub fn sync_op<A, F>(self, command: &str, params: Vec<ParamSpec>, handler: F) -> Self
    where
        A: FromBoundArgs + 'static,
        F: Fn(B, A) -> Result<()> + Send + Sync + 'static,
    {
        self.insert_op(
            command,
            params,
            A::ARITY,
            Arc::new(move |instance, values| {
                let bag = match downcast_bag::<B>(instance) {
                    Ok(bag) => bag,
                    Err(error) => return Completion::Ready(Err(error)),
                };
                let args = match A::from_bound(values) {
                    Ok(args) => args,
                    Err(error) => return Completion::Ready(Err(error)),
                };
                Completion::Ready(handler(bag, args))
            }),
        )
    }

    /// Declares an asynchronous operation. The returned future is awaited
    /// by the invocation adapter before the dispatch completes.
    pub fn async_op<A, F, Fut>(self, command: &str, params: Vec<ParamSpec>, handler: F) -> Self
    where
        A: FromBoundArgs + 'static,
        F: Fn(B, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.insert_op(
            command,
            params,
            A::ARITY,
            Arc::new(move |instance, values| {
                let bag = match downcast_bag::<B>(instance) {
                    Ok(bag) => bag,
                    Err(error) => return Completion::Ready(Err(error)),
                };
                let args = match A::from_bound(values) {
                    Ok(args) => args,
                    Err(error) => return Completion::Ready(Err(error)),
                };
                Completion::Deferred(Box::pin(handler(bag, args)))
            }),
        )
    }

    /// Finalizes the bag spec.
    pub fn build(self) -> BagSpec {
        BagSpec {
            type_name: std::any::type_name::<B>(),
            type_id: TypeId::of::<B>(),
            operations: self.operations,
        }
    }

    fn insert_op(
        mut self,
        command: &str,
        params: Vec<ParamSpec>,
        arity: usize,
        invoke: InvokeFn,
    ) -> Self {
        assert_eq!(
            params.len(),
            arity,
            "operation '{command}' declares {} parameters but its handler binds {arity}",
            params.len(),
        );
        let method = dash_case_to_pascal_case(command);
        let spec = OperationSpec {
            command: command.to_string(),
            method: method.clone(),
            params,
            invoke,
        };
        let replaced = self.operations.insert(method, spec);
        assert!(
            replaced.is_none(),
            "operation '{command}' is declared twice on the same bag",
        );
        self
    }
}

impl<B> fmt::Debug for BagBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BagBuilder")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn downcast_bag<B: Any + Send>(instance: BagInstance) -> Result<B> {
    instance
        .downcast::<B>()
        .map(|boxed| *boxed)
        .map_err(|_| {
            anyhow!(
                "service instance is not of bag type {}",
                std::any::type_name::<B>()
            )
        })
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    // --- Normalization Tests ---

    #[test]
    fn test_dash_case_to_pascal_case() {
        assert_eq!(dash_case_to_pascal_case("create-admin"), "CreateAdmin");
        assert_eq!(dash_case_to_pascal_case("do-thing"), "DoThing");
        assert_eq!(dash_case_to_pascal_case("charge"), "Charge");
    }

    #[test]
    fn test_normalization_discards_empty_segments() {
        assert_eq!(dash_case_to_pascal_case("a--b"), "AB");
        assert_eq!(dash_case_to_pascal_case("-leading-dash"), "LeadingDash");
        assert_eq!(dash_case_to_pascal_case("trailing-"), "Trailing");
        assert_eq!(dash_case_to_pascal_case(""), "");
    }

    #[test]
    fn test_normalization_pins_pascal_case_input() {
        // An already-normalized name is a single segment: first character
        // kept upper, the remainder forced lower.
        assert_eq!(dash_case_to_pascal_case("CreateAdmin"), "Createadmin");
        assert_eq!(
            dash_case_to_pascal_case(&dash_case_to_pascal_case("create-admin")),
            "Createadmin"
        );
    }

    // --- BoundValue Tests ---

    #[test]
    fn test_bound_value_roundtrip() {
        let value = BoundValue::new(42i64);
        assert_eq!(value.take::<i64>().unwrap(), 42);
    }

    #[test]
    fn test_bound_value_wrong_type() {
        let value = BoundValue::new("text".to_string());
        let error = value.take::<i64>().unwrap_err();
        assert!(error.to_string().contains("i64"));
    }

    // --- FromBoundArgs Tests ---

    #[test]
    fn test_tuple_extraction() {
        let values = vec![
            BoundValue::new("Alice".to_string()),
            BoundValue::new(18i64),
        ];
        let (name, age) = <(String, i64)>::from_bound(values).unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(age, 18);
    }

    #[test]
    fn test_tuple_extraction_arity_mismatch() {
        let values = vec![BoundValue::new(1i64)];
        let error = <(i64, i64)>::from_bound(values).unwrap_err();
        assert!(error.to_string().contains("binds 2 arguments"));
    }

    #[test]
    fn test_unit_extraction_ignores_values() {
        assert_eq!(<() as FromBoundArgs>::ARITY, 0);
        <()>::from_bound(Vec::new()).unwrap();
    }

    // --- ParamSpec Tests ---

    #[test]
    fn test_param_default_is_used_verbatim() {
        let spec = ParamSpec::with_default("age", 18i64);
        assert!(spec.has_default());
        let value = spec.default_value().unwrap();
        assert_eq!(value.take::<i64>().unwrap(), 18);
    }

    #[test]
    fn test_required_param_has_no_default() {
        let spec = ParamSpec::required::<String>("name");
        assert!(!spec.has_default());
        assert!(spec.default_value().is_none());
    }

    // --- BagBuilder Tests ---

    struct Probe;

    #[test]
    fn test_builder_normalizes_operation_names() {
        let spec = BagSpec::builder::<Probe>()
            .sync_op("create-admin", Vec::new(), |_bag: Probe, (): ()| Ok(()))
            .build();
        assert!(spec.operation("CreateAdmin").is_some());
        assert!(spec.operation("create-admin").is_none());
        assert_eq!(
            spec.operation("CreateAdmin").unwrap().command(),
            "create-admin"
        );
    }

    #[test]
    fn test_builder_records_type_identity() {
        let spec = BagSpec::builder::<Probe>().build();
        assert_eq!(spec.type_id(), std::any::TypeId::of::<Probe>());
        assert!(spec.type_name().contains("Probe"));
    }

    #[test]
    #[should_panic(expected = "declared twice")]
    fn test_builder_rejects_duplicate_operation() {
        let _ = BagSpec::builder::<Probe>()
            .sync_op("list", Vec::new(), |_bag: Probe, (): ()| Ok(()))
            .sync_op("list", Vec::new(), |_bag: Probe, (): ()| Ok(()));
    }

    #[test]
    #[should_panic(expected = "declares 1 parameters")]
    fn test_builder_rejects_arity_mismatch() {
        let _ = BagSpec::builder::<Probe>().sync_op(
            "rename",
            vec![ParamSpec::required::<String>("name")],
            |_bag: Probe, (): ()| Ok(()),
        );
    }

    #[test]
    fn test_sync_invoke_closure_runs_handler() {
        let spec = BagSpec::builder::<Probe>()
            .sync_op(
                "check",
                vec![ParamSpec::required::<i64>("value")],
                |_bag: Probe, (value,): (i64,)| {
                    assert_eq!(value, 7);
                    Ok(())
                },
            )
            .build();
        let op = spec.operation("Check").unwrap();
        let completion = op.call(Box::new(Probe), vec![BoundValue::new(7i64)]);
        match completion {
            Completion::Ready(result) => result.unwrap(),
            Completion::Deferred(_) => panic!("synchronous operation produced deferred work"),
        }
    }
}
