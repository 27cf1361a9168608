//! Declaración y resolución de parámetros de step.
//!
//! La resolución sigue prioridad estricta por parámetro declarado:
//! 1. valor ligado explícitamente a esta instancia del step (binding),
//! 2. valor actual en el `parameter_index` del pipeline,
//! 3. default declarado por el propio step.
//! Requerido sin ninguna de las tres fuentes = fallo de configuración.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::errors::CoreError;

#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: String,
    pub data_type: ParameterType,
    pub required: bool,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterDefinition {
    pub fn required(name: impl Into<String>, data_type: ParameterType) -> Self {
        Self { name: name.into(),
               description: String::new(),
               data_type,
               required: true,
               default_value: None }
    }

    pub fn optional(name: impl Into<String>, data_type: ParameterType, default: Value) -> Self {
        Self { name: name.into(),
               description: String::new(),
               data_type,
               required: false,
               default_value: Some(default) }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Merge shallow determinista: claves de `b` reemplazan a las de `a` cuando
/// ambos son objetos; si alguno no es objeto, `b` tiene precedencia.
pub fn merge_json(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let mut out = ma.clone();
            for (k, v) in mb.iter() {
                out.insert(k.clone(), v.clone());
            }
            Value::Object(out)
        }
        // Non-objects: override
        (_, other) => other.clone(),
    }
}

/// Params base deterministas de un step: defaults declarados + bindings de
/// instancia. Es el insumo de parámetros del fingerprint (no depende de
/// valores de runtime del índice).
pub fn base_parameters(definitions: &HashMap<String, ParameterDefinition>, bindings: &Value) -> Value {
    let mut defaults = Map::new();
    for (name, def) in definitions {
        if let Some(d) = &def.default_value {
            defaults.insert(name.clone(), d.clone());
        }
    }
    merge_json(&Value::Object(defaults), bindings)
}

/// Resuelve los parámetros efectivos de una ejecución.
pub fn resolve_parameters(step_key: &str,
                          definitions: &HashMap<String, ParameterDefinition>,
                          index: &IndexMap<String, Value>,
                          bindings: &Value)
                          -> Result<Value, CoreError> {
    let mut out = Map::new();
    for (name, def) in definitions {
        if let Some(v) = bindings.get(name) {
            out.insert(name.clone(), v.clone());
        } else if let Some(v) = index.get(name) {
            out.insert(name.clone(), v.clone());
        } else if let Some(d) = &def.default_value {
            out.insert(name.clone(), d.clone());
        } else if def.required {
            return Err(CoreError::MissingParameter { step: step_key.to_string(),
                                                     param: name.clone() });
        }
    }
    // Bindings con claves extra (no declaradas) también viajan al step.
    if let Value::Object(extra) = bindings {
        for (k, v) in extra {
            out.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs() -> HashMap<String, ParameterDefinition> {
        let mut m = HashMap::new();
        m.insert("factor".to_string(),
                 ParameterDefinition::optional("factor", ParameterType::Number, json!(1.0)));
        m.insert("target".to_string(), ParameterDefinition::required("target", ParameterType::String));
        m
    }

    #[test]
    fn binding_wins_over_index_and_default() {
        let mut index = IndexMap::new();
        index.insert("factor".to_string(), json!(5.0));
        index.insert("target".to_string(), json!("from-index"));

        let bindings = json!({"factor": 9.0});
        let params = resolve_parameters("00-s", &defs(), &index, &bindings).unwrap();
        assert_eq!(params["factor"], json!(9.0));
        assert_eq!(params["target"], json!("from-index"));
    }

    #[test]
    fn default_fills_missing_optional() {
        let mut index = IndexMap::new();
        index.insert("target".to_string(), json!("t"));
        let params = resolve_parameters("00-s", &defs(), &index, &json!({})).unwrap();
        assert_eq!(params["factor"], json!(1.0));
    }

    #[test]
    fn missing_required_is_config_fault() {
        let err = resolve_parameters("00-s", &defs(), &IndexMap::new(), &json!({})).unwrap_err();
        assert_eq!(err,
                   CoreError::MissingParameter { step: "00-s".into(),
                                                 param: "target".into() });
    }

    #[test]
    fn merge_json_shallow_override() {
        let merged = merge_json(&json!({"a": 1, "b": 2}), &json!({"b": 3, "c": 4}));
        assert_eq!(merged, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn base_parameters_are_defaults_plus_bindings() {
        let base = base_parameters(&defs(), &json!({"target": "bound"}));
        assert_eq!(base, json!({"factor": 1.0, "target": "bound"}));
    }
}
