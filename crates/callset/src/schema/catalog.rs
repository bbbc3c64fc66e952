//! Tool catalogs: the list of function definitions a dataset is built from.
//!
//! A catalog file is a JSON array of OpenAI tool entries
//! (`{"type": "function", "function": {...}}`); bare function objects
//! (`{"name", "description", "parameters"}`) are accepted too. A drone
//! control catalog ships with the crate.

use super::ToolSchema;
use crate::error::GenError;
use crate::{FunctionDef, ToolDef, ToolType};
use serde::Deserialize;
use std::path::Path;

const DRONE_CATALOG: &str = include_str!("../../catalog/drone.json");

/// Name of the catch-all tool in the drone catalog. It has no arguments
/// worth enumerating and is left out of generated datasets.
pub const DEFAULT_REJECT_TOOL: &str = "reject_request";

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogEntry {
    Tool(ToolDef),
    Function(FunctionDef),
}

impl From<CatalogEntry> for ToolDef {
    fn from(entry: CatalogEntry) -> Self {
        match entry {
            CatalogEntry::Tool(def) => def,
            CatalogEntry::Function(function) => ToolDef {
                tool_type: ToolType::Function,
                function,
            },
        }
    }
}

/// A catalog entry: the raw definition (sent to the model as context) and
/// its parsed schema (used for enumeration).
#[derive(Debug, Clone)]
pub struct CatalogTool {
    pub def: ToolDef,
    pub schema: ToolSchema,
}

impl CatalogTool {
    pub fn name(&self) -> &str {
        &self.schema.name
    }
}

/// An ordered, name-unique set of tools.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<CatalogTool>,
}

impl Catalog {
    /// Parse schemas for every definition. Fails on the first unsupported
    /// parameter block or repeated tool name.
    pub fn from_defs(defs: Vec<ToolDef>) -> Result<Self, GenError> {
        let mut tools: Vec<CatalogTool> = Vec::with_capacity(defs.len());
        for def in defs {
            if tools.iter().any(|t| t.name() == def.name()) {
                return Err(GenError::DuplicateTool(def.name().to_string()));
            }
            let schema = ToolSchema::from_tool_def(&def).map_err(|source| GenError::Schema {
                tool: def.name().to_string(),
                source,
            })?;
            tools.push(CatalogTool { def, schema });
        }
        Ok(Self { tools })
    }

    pub fn from_json(text: &str) -> Result<Self, GenError> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(text).map_err(GenError::CatalogParse)?;
        Self::from_defs(entries.into_iter().map(ToolDef::from).collect())
    }

    pub fn load(path: &Path) -> Result<Self, GenError> {
        let text = std::fs::read_to_string(path).map_err(|source| GenError::CatalogIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// The built-in drone control catalog (16 tools, including
    /// [`DEFAULT_REJECT_TOOL`]).
    pub fn builtin_drone() -> Result<Self, GenError> {
        Self::from_json(DRONE_CATALOG)
    }

    pub fn tools(&self) -> &[CatalogTool] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&CatalogTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions in catalog order, for attaching to a request.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.iter().map(|t| t.def.clone()).collect()
    }

    /// A copy without the named tool. Unknown names are a no-op.
    pub fn without(&self, name: &str) -> Self {
        Self {
            tools: self
                .tools
                .iter()
                .filter(|t| t.name() != name)
                .cloned()
                .collect(),
        }
    }

    /// A copy restricted to the given names, keeping catalog order. Returns
    /// the names that matched nothing alongside.
    pub fn only<S: AsRef<str>>(&self, names: &[S]) -> (Self, Vec<String>) {
        let missing = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| self.get(n).is_none())
            .map(str::to_string)
            .collect();
        let tools = self
            .tools
            .iter()
            .filter(|t| names.iter().any(|n| n.as_ref() == t.name()))
            .cloned()
            .collect();
        (Self { tools }, missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    #[test]
    fn builtin_drone_catalog_loads() {
        let catalog = Catalog::builtin_drone().unwrap();
        assert_eq!(catalog.len(), 16);
        assert!(catalog.get(DEFAULT_REJECT_TOOL).is_some());

        let takeoff = catalog.get("takeoff_drone").unwrap();
        assert_eq!(takeoff.schema.parameters.required(), ["altitude"]);
        assert_eq!(
            takeoff.schema.parameters.field("altitude").unwrap().spec,
            FieldSpec::Integer
        );
    }

    #[test]
    fn without_drops_reject_tool() {
        let catalog = Catalog::builtin_drone().unwrap().without(DEFAULT_REJECT_TOOL);
        assert_eq!(catalog.len(), 15);
        assert!(catalog.get(DEFAULT_REJECT_TOOL).is_none());
    }

    #[test]
    fn only_keeps_catalog_order_and_reports_missing() {
        let catalog = Catalog::builtin_drone().unwrap();
        let (subset, missing) = catalog.only(&["set_autopilot", "takeoff_drone", "fly_to_mars"]);
        let names: Vec<&str> = subset.tools().iter().map(|t| t.name()).collect();
        assert_eq!(names, ["takeoff_drone", "set_autopilot"]);
        assert_eq!(missing, ["fly_to_mars"]);
    }

    #[test]
    fn accepts_bare_function_entries() {
        let catalog = Catalog::from_json(
            r#"[{"name": "ping", "description": "Ping.", "parameters": {"type": "object", "properties": {}}}]"#,
        )
        .unwrap();
        assert_eq!(catalog.tools()[0].def.tool_type, ToolType::Function);
        assert_eq!(catalog.tools()[0].name(), "ping");
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = Catalog::from_json(r#"[{"name": "ping"}, {"name": "ping"}]"#).unwrap_err();
        assert!(matches!(err, GenError::DuplicateTool(name) if name == "ping"));
    }

    #[test]
    fn bad_schema_names_the_tool() {
        let err = Catalog::from_json(
            r#"[{"name": "broken", "parameters": {"properties": {}, "required": ["ghost"]}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, GenError::Schema { ref tool, .. } if tool == "broken"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Catalog::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, GenError::CatalogIo { .. }));
    }
}
