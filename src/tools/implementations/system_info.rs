// get_system_info - host summary

use crate::errors::ToolError;
use crate::tools::implementations::format_file_size;
use crate::tools::registry::Tool;
use crate::tools::types::{ParameterSpec, ToolArguments, ToolContext};
use async_trait::async_trait;
use serde_json::{json, Value};
use sysinfo::System;

pub struct SystemInfoTool;

#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &str {
        "get_system_info"
    }

    fn description(&self) -> &str {
        "Get a summary of the operating system, CPU count, memory and uptime"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn execute(
        &self,
        _arguments: &ToolArguments,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();

        Ok(json!({
            "os_name": System::name(),
            "os_version": System::os_version(),
            "kernel_version": System::kernel_version(),
            "host_name": System::host_name(),
            "cpu_count": system.cpus().len(),
            "total_memory": system.total_memory(),
            "total_memory_formatted": format_file_size(system.total_memory()),
            "used_memory": system.used_memory(),
            "used_memory_formatted": format_file_size(system.used_memory()),
            "uptime_seconds": System::uptime(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::PathResolver;

    #[tokio::test]
    async fn test_system_info() {
        let context = ToolContext::new(PathResolver::new("/home/tester"));
        let info = SystemInfoTool
            .execute(&ToolArguments::new(), &context)
            .await
            .unwrap();

        assert!(info["cpu_count"].as_u64().unwrap() >= 1);
        assert!(info["total_memory"].as_u64().unwrap() > 0);
        assert!(info["total_memory_formatted"].is_string());
    }
}
