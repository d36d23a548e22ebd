//! Attach channel to a running stdio provider instance.
//!
//! The attach descriptor is rendered into a command line (by default
//! `kubectl attach -i -q -n <namespace> <pod> -c <channel>`) whose stdin and
//! stdout carry the JSON-RPC stream.

use std::{collections::HashMap, sync::Arc, time::Duration};

use {toolgate_common::types::AttachTarget, tracing::debug};

use crate::{error::Result, stdio::StdioTransport};

/// How attach channels are opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOptions {
    pub command: String,
    /// Arguments with `{namespace}`, `{pod}` and `{channel}` placeholders.
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub request_timeout: Duration,
}

impl Default for AttachOptions {
    fn default() -> Self {
        Self {
            command: "kubectl".into(),
            args: default_attach_args(),
            env: HashMap::new(),
            request_timeout: crate::stdio::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

pub fn default_attach_args() -> Vec<String> {
    [
        "attach",
        "-i",
        "-q",
        "-n",
        "{namespace}",
        "{pod}",
        "-c",
        "{channel}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Substitute the target's identity into the argument template.
pub fn render_args(template: &[String], target: &AttachTarget) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            arg.replace("{namespace}", &target.namespace)
                .replace("{pod}", &target.pod_name)
                .replace("{channel}", &target.channel)
        })
        .collect()
}

/// Open a stdio transport attached to `target`.
pub async fn attach(target: &AttachTarget, options: &AttachOptions) -> Result<Arc<StdioTransport>> {
    let args = render_args(&options.args, target);
    debug!(
        namespace = %target.namespace,
        pod = %target.pod_name,
        channel = %target.channel,
        "opening attach channel"
    );
    StdioTransport::spawn(&options.command, &args, &options.env, options.request_timeout).await
}
