//! Template filters: the built-in `short` filter and Rhai functions declared
//! in the `filters` section of the configuration.

use std::sync::Arc;

use minijinja::Environment;
use rhai::{AST, Dynamic, Engine, Scope};
use tracing::debug;
use verinfo_errors::{VerError, VerResult};

use crate::config::FilterSpec;

/// Length `short` cuts revisions down to.
pub const SHORT_REVISION_LEN: usize = 12;

/// Cuts a revision id to its first twelve characters.
pub fn short(value: String) -> String {
    value.chars().take(SHORT_REVISION_LEN).collect()
}

//
// Each FilterSpec becomes a Rhai function whose body is the provided script,
// e.g.
//     fn upper_rev(rev) { rev.to_upper() }
//
// All definitions are compiled into one AST that every filter closure shares.
//

/// Compiled Rhai filters, ready to be registered on an environment.
#[derive(Clone)]
pub struct ScriptFilters {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    names: Vec<String>,
}

impl ScriptFilters {
    pub fn compile(specs: &[FilterSpec]) -> VerResult<Self> {
        let engine = Engine::new();
        let mut func_defs = String::new();

        for spec in specs {
            let arg_list = spec
                .arguments
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            let def = format!("fn {}({}) {{ {} }}\n", spec.function, arg_list, spec.script);

            // Compile alone first so a failure names its filter
            engine.compile(&def).map_err(|err| VerError::FilterCompile {
                function: spec.function.clone(),
                reason: err.to_string(),
            })?;

            func_defs.push_str(&def);
        }

        let ast = engine
            .compile(func_defs)
            .map_err(|err| VerError::FilterCompile {
                function: "<all>".to_string(),
                reason: err.to_string(),
            })?;

        debug!(count = specs.len(), "compiled script filters");

        Ok(Self {
            engine: Arc::new(engine),
            ast: Arc::new(ast),
            names: specs.iter().map(|s| s.function.clone()).collect(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Registers every function as a filter taking the piped value as a string.
    pub fn register(&self, env: &mut Environment<'_>) {
        for name in &self.names {
            let fn_name = name.clone();
            let e = Arc::clone(&self.engine);
            let a = Arc::clone(&self.ast);

            env.add_filter(
                name.clone(),
                move |value: String| -> Result<String, minijinja::Error> {
                    let mut scope = Scope::new();

                    let result: Dynamic =
                        e.call_fn(&mut scope, &a, &fn_name, (value,))
                            .map_err(|err| {
                                minijinja::Error::new(
                                    minijinja::ErrorKind::InvalidOperation,
                                    format!("Rhai Call Error: {err}"),
                                )
                            })?;

                    Ok(result.to_string())
                },
            );
        }
    }
}

/// Registers the built-in filters.
pub fn register_builtin(env: &mut Environment<'_>) {
    env.add_filter("short", short);
}

#[cfg(test)]
mod tests {
    use minijinja::context;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ArgumentSpec;

    fn spec(function: &str, args: &[&str], script: &str) -> FilterSpec {
        FilterSpec {
            function: function.to_string(),
            arguments: args
                .iter()
                .map(|name| ArgumentSpec {
                    name: name.to_string(),
                })
                .collect(),
            script: script.to_string(),
        }
    }

    #[test]
    fn test_short_truncates() {
        assert_eq!(short("0123456789abcdef0123".to_string()), "0123456789ab");
        assert_eq!(short("abc".to_string()), "abc");
    }

    #[test]
    fn test_builtin_short_in_template() {
        let mut env = Environment::new();
        register_builtin(&mut env);
        let out = env
            .render_str("{{ rev | short }}", context! { rev => "0123456789abcdef" })
            .unwrap();
        assert_eq!(out, "0123456789ab");
    }

    #[test]
    fn test_script_filter_registered() {
        let filters = ScriptFilters::compile(&[
            spec("upper_rev", &["rev"], "rev.to_upper()"),
            spec("bracket", &["s"], r#""[" + s + "]""#),
        ])
        .unwrap();
        assert_eq!(filters.names(), ["upper_rev", "bracket"]);

        let mut env = Environment::new();
        filters.register(&mut env);
        let out = env
            .render_str("{{ rev | upper_rev | bracket }}", context! { rev => "abc123" })
            .unwrap();
        assert_eq!(out, "[ABC123]");
    }

    #[test]
    fn test_script_filter_compile_error() {
        let err = ScriptFilters::compile(&[spec("broken", &["x"], "x +")])
            .err()
            .expect("invalid body must fail");
        assert!(matches!(
            err,
            VerError::FilterCompile { ref function, .. } if function == "broken"
        ));
    }

    #[test]
    fn test_script_filter_runtime_error() {
        let filters = ScriptFilters::compile(&[spec("num", &["x"], "parse_int(x) * 2")]).unwrap();
        let mut env = Environment::new();
        filters.register(&mut env);

        assert_eq!(env.render_str("{{ '21' | num }}", context! {}).unwrap(), "42");
        assert!(env.render_str("{{ 'abc' | num }}", context! {}).is_err());
    }
}
