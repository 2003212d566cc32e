// src/core/resolver.rs

use std::sync::Arc;

use thiserror::Error;

use crate::{
    constants::ENTRY_TOKEN_SEPARATOR,
    core::{invoker, params::ParseError, registry::BagRegistry},
    models::{BoundValue, OperationSpec, dash_case_to_pascal_case},
    system::provider::ServiceProvider,
};

/// Everything that can terminate a dispatch. Every kind is terminal and
/// non-retriable; there is no partial success.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The entry token is missing or does not split into `prefix:command`.
    #[error("argument '{entry}' does not comply to the format prefix:command; cannot resolve")]
    InvalidFormat {
        /// The offending entry token (empty when no arguments were given).
        entry: String,
    },
    /// No command bag is registered under the entry token's prefix.
    #[error("command bag with prefix '{prefix}' was not found; either the prefix is wrong or the bag was never registered")]
    CommandBagNotFound {
        /// The prefix that missed.
        prefix: String,
    },
    /// The normalized command name matches no operation on the bag.
    #[error("command bag method '{method}' for command '{command}' was not found")]
    CommandBagMethodNotFound {
        /// The dash-case command as received.
        command: String,
        /// The method identifier it normalized to.
        method: String,
    },
    /// The service provider has no factory for the bag's type.
    #[error("command bag type '{type_name}' was not registered in the service collection; add the bag as a service so instances can be created")]
    CommandBagServiceNotRegistered {
        /// The bag type that could not be instantiated.
        type_name: String,
    },
    /// A required parameter has neither a supplied token nor a declared
    /// default.
    #[error("missing argument for parameter '{param}' of method '{method}'; arguments received: {args:?}")]
    MissingArgument {
        /// The parameter that went unbound.
        param: String,
        /// The method being bound.
        method: String,
        /// The full argument list received, for diagnostics.
        args: Vec<String>,
    },
    /// A supplied token could not be coerced to its parameter's type. This
    /// is the single shape every binding-time conversion failure is
    /// re-wrapped into; the precise cause stays attached underneath.
    #[error("could not bind argument '{token}' to type {type_name}")]
    ArgumentParsing {
        /// The token that failed to convert.
        token: String,
        /// The parameter's declared type.
        type_name: &'static str,
        /// The parser's own failure.
        #[source]
        source: ParseError,
    },
    /// The invoked operation itself failed. Passed through unchanged —
    /// never reinterpreted as a binding failure.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

type DispatchResult<T> = Result<T, DispatchError>;

/// The dispatch orchestrator.
///
/// One `resolve` call is one dispatch: parse the entry token, look up the
/// bag, normalize the command name, acquire an instance from a fresh
/// service scope, bind arguments, invoke. Both collaborators are read-only
/// at this point, so the resolver is freely shareable.
pub struct CommandResolver {
    registry: Arc<BagRegistry>,
    provider: ServiceProvider,
}

impl CommandResolver {
    /// Builds a resolver over an already-populated registry and provider.
    pub fn new(registry: Arc<BagRegistry>, provider: ServiceProvider) -> Self {
        Self { registry, provider }
    }

    /// Dispatches one command invocation.
    ///
    /// `args[0]` must be the `prefix:command` entry token; everything after
    /// it is bound positionally to the resolved operation's parameters. The
    /// service scope opened here lives until this call returns and is
    /// released on every exit path, including each failure below.
    pub async fn resolve(&self, args: &[String]) -> DispatchResult<()> {
        log::debug!("Dispatching args: {args:?}");

        let entry = args.first().ok_or_else(|| DispatchError::InvalidFormat {
            entry: String::new(),
        })?;
        let (prefix, command) = split_entry_token(entry)?;

        let bag = self
            .registry
            .lookup(prefix)
            .map_err(|_| DispatchError::CommandBagNotFound {
                prefix: prefix.to_string(),
            })?;
        let method = dash_case_to_pascal_case(command);

        let scope = self.provider.create_scope();
        let instance = scope.resolve(bag.type_id()).ok_or_else(|| {
            DispatchError::CommandBagServiceNotRegistered {
                type_name: bag.type_name().to_string(),
            }
        })?;
        let operation =
            bag.operation(&method)
                .ok_or_else(|| DispatchError::CommandBagMethodNotFound {
                    command: command.to_string(),
                    method: method.clone(),
                })?;

        let bound = bind_arguments(operation, args)?;
        log::debug!(
            "Invoking {}::{} (scope {}) with {} bound argument(s).",
            bag.type_name(),
            operation.method(),
            scope.id(),
            bound.len()
        );
        invoker::invoke(operation, instance, bound).await?;
        Ok(())
    }
}

impl std::fmt::Debug for CommandResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandResolver")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Splits an entry token into its prefix and command halves. Exactly one
/// separator with non-empty halves is accepted; anything else is a format
/// failure before any lookup happens.
fn split_entry_token(entry: &str) -> DispatchResult<(&str, &str)> {
    let mut parts = entry.split(ENTRY_TOKEN_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(prefix), Some(command), None) if !prefix.is_empty() && !command.is_empty() => {
            Ok((prefix, command))
        }
        _ => Err(DispatchError::InvalidFormat {
            entry: entry.to_string(),
        }),
    }
}

/// Assembles the bound argument list for `operation`.
///
/// Parameters are paired with `args[1..]` by position. A missing token
/// falls back to the parameter's declared default, used verbatim; a token
/// that fails to parse is re-wrapped into the aggregate binding error
/// carrying the parser's failure. Surplus tokens are ignored.
fn bind_arguments(operation: &OperationSpec, args: &[String]) -> DispatchResult<Vec<BoundValue>> {
    let supplied = args.get(1..).unwrap_or_default();
    let params = operation.params();

    let mut bound = Vec::with_capacity(params.len());
    for (position, param) in params.iter().enumerate() {
        match supplied.get(position) {
            Some(token) => {
                let value =
                    param
                        .parse(token)
                        .map_err(|source| DispatchError::ArgumentParsing {
                            token: token.clone(),
                            type_name: param.type_name(),
                            source,
                        })?;
                bound.push(value);
            }
            None => match param.default_value() {
                Some(value) => {
                    log::debug!(
                        "No token for parameter '{}'; using its declared default.",
                        param.name()
                    );
                    bound.push(value);
                }
                None => {
                    return Err(DispatchError::MissingArgument {
                        param: param.name().to_string(),
                        method: operation.method().to_string(),
                        args: args.to_vec(),
                    });
                }
            },
        }
    }

    if supplied.len() > params.len() {
        log::debug!(
            "Ignoring {} surplus positional argument(s): {:?}",
            supplied.len() - params.len(),
            &supplied[params.len()..]
        );
    }
    Ok(bound)
}

// MARK: --- UNIT TESTS ---
