// Docker runtime via bollard

use super::{ContainerHandle, ContainerRuntime, RawStream};
use crate::error::RuntimeError;
use bollard::Docker;
use bollard::query_parameters::{InspectContainerOptions, LogsOptions, StatsOptions};
use bytes::Bytes;
use futures_util::StreamExt;

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_unix_defaults()?;
        Ok(Self { docker })
    }

    pub async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))
    }
}

impl ContainerRuntime for DockerRuntime {
    type Handle = DockerHandle;

    async fn resolve(&self, id: &str) -> Result<DockerHandle, RuntimeError> {
        match self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
        {
            Ok(info) => {
                let resolved_id = info.id.unwrap_or_else(|| id.to_string());
                tracing::debug!(container = id, id = %resolved_id, "Resolved container");
                Ok(DockerHandle {
                    docker: self.docker.clone(),
                    id: resolved_id,
                    name: id.to_string(),
                })
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(RuntimeError::NotFound(id.to_string())),
            Err(e) => Err(RuntimeError::Unavailable(e.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct DockerHandle {
    docker: Docker,
    id: String,
    name: String,
}

impl ContainerHandle for DockerHandle {
    fn log_stream(&self, follow: bool, tail: usize) -> RawStream {
        let options = LogsOptions {
            follow,
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };
        let name = self.name.clone();
        self.docker
            .logs(&self.id, Some(options))
            .map(move |chunk| {
                chunk.map(|out| out.into_bytes()).map_err(|e| {
                    tracing::warn!(container = %name, error = %e, "Log stream error");
                    RuntimeError::Stream(e.to_string())
                })
            })
            .boxed()
    }

    fn stats_stream(&self) -> RawStream {
        let options = StatsOptions {
            stream: true,
            ..Default::default()
        };
        let name = self.name.clone();
        // bollard hands back decoded documents; re-encode them so samplers parse the wire schema
        self.docker
            .stats(&self.id, Some(options))
            .map(move |frame| match frame {
                Ok(s) => serde_json::to_vec(&s)
                    .map(Bytes::from)
                    .map_err(|e| RuntimeError::Stream(e.to_string())),
                Err(e) => {
                    tracing::warn!(container = %name, error = %e, "Stats stream error");
                    Err(RuntimeError::Stream(e.to_string()))
                }
            })
            .boxed()
    }
}
