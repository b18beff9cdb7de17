use std::collections::HashMap;

use intellibot_model::{ModelTool, ToolCallRequest};

use crate::tool::{BoxedToolFuture, Error, ToolObject};

/// The set of tools an agent can offer to the model.
///
/// Tools keep their registration order, which is also the order they are
/// advertised to the model in.
pub struct Registry {
    tools: Vec<Box<dyn ToolObject>>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Self {
        let mut registry = Self {
            tools: Vec::with_capacity(tools.len()),
            by_name: HashMap::with_capacity(tools.len()),
        };
        for tool in tools {
            registry.insert(tool);
        }
        registry
    }

    fn insert(&mut self, tool: Box<dyn ToolObject>) {
        let name = tool.name().to_owned();
        if let Some(&idx) = self.by_name.get(&name) {
            warn!("tool `{name}` registered twice, keeping the last one");
            self.tools[idx] = tool;
            return;
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
    }

    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .iter()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    pub fn execute(&self, req: &ToolCallRequest) -> BoxedToolFuture {
        let Some(&idx) = self.by_name.get(&req.name) else {
            warn!("tool not found: {}", req.name);
            let err = Error::not_found()
                .with_reason(format!("no tool named `{}`", req.name));
            return Box::pin(std::future::ready(Err(err)));
        };
        trace!("executing tool {} ({}) with args: {:?}", req.name, req.id, req.arguments);
        self.tools[idx].execute(req.arguments.clone())
    }
}
