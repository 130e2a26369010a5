use std::collections::HashMap;
use std::sync::Arc;

use beacon_core::error::{BeaconError, Result};
use beacon_core::model::{
    Application, ApplicationResponse, ApplicationsResponse, Instance, InstanceResponse,
};
use beacon_core::transport::{HttpRequest, HttpResponse, HttpTransport};

use super::selector::ServiceUrlSelector;

const PATH_APPS: &str = "apps";

/// Registry REST calls, one selected server URL per call.
pub struct RegistryApi {
    transport: Arc<dyn HttpTransport>,
    selector: ServiceUrlSelector,
}

impl RegistryApi {
    /// Create a new registry API.
    pub fn new(transport: Arc<dyn HttpTransport>, selector: ServiceUrlSelector) -> Self {
        Self {
            transport,
            selector,
        }
    }

    /// Single registration attempt: `POST /apps/{app}`; only 204 succeeds.
    pub async fn register(&self, instance: &Instance) -> Result<()> {
        let url = self.selector.build_url(&[PATH_APPS, &instance.app_name]);
        tracing::info!(
            "Registering [{}] with instance: {}",
            url,
            instance.instance_id
        );

        let request = HttpRequest::post(url, &instance.to_request())?;
        let response = self.transport.execute(request).await.map_err(|e| match e {
            BeaconError::Transport(msg) => {
                BeaconError::Transport(format!("Could not complete registration: {}", msg))
            }
            other => other,
        })?;

        if response.status != 204 {
            return Err(BeaconError::Protocol {
                status: response.status,
                context: format!(
                    "registering instance={} app={}",
                    instance.instance_id, instance.app_name
                ),
                body: response.body,
            });
        }
        Ok(())
    }

    /// Renew the lease: `PUT /apps/{app}/{id}` with `{}`.
    ///
    /// 404 maps to [`BeaconError::Evicted`].
    pub async fn send_heartbeat(&self, instance: &Instance) -> Result<()> {
        let url = self
            .selector
            .build_url(&[PATH_APPS, &instance.app_name, &instance.instance_id]);
        let request = HttpRequest::put(url, &serde_json::json!({}))?;
        let response = self.transport.execute(request).await?;

        match response.status {
            200 => {
                tracing::debug!("successful heartbeat: {}", response.status);
                Ok(())
            }
            404 => Err(BeaconError::Evicted {
                app: instance.app_name.clone(),
                instance_id: instance.instance_id.clone(),
            }),
            status => Err(BeaconError::Protocol {
                status,
                context: format!("heartbeat for instance {}", instance.instance_id),
                body: response.body,
            }),
        }
    }

    /// Remove the instance: `DELETE /apps/{app}/{id}`. Any status is accepted.
    pub async fn deregister(&self, instance: &Instance) -> Result<u16> {
        let url = self
            .selector
            .build_url(&[PATH_APPS, &instance.app_name, &instance.instance_id]);
        let response = self.transport.execute(HttpRequest::delete(url)).await?;
        Ok(response.status)
    }

    /// Look up one instance.
    pub async fn get_instance(&self, app: &str, id: &str) -> Result<Instance> {
        let url = self.selector.build_url(&[PATH_APPS, app, id]);
        let response = self.fetch(url, "instance lookup").await?;
        Ok(response.json::<InstanceResponse>()?.instance)
    }

    /// Look up one application and its instances.
    pub async fn get_application(&self, name: &str) -> Result<Application> {
        let url = self.selector.build_url(&[PATH_APPS, name]);
        tracing::info!("{}", url);
        let response = self.fetch(url, "application lookup").await?;
        Ok(response.json::<ApplicationResponse>()?.application)
    }

    /// All applications keyed by name.
    pub async fn get_applications(&self) -> Result<HashMap<String, Application>> {
        let url = self.selector.build_url(&[PATH_APPS]);
        let response = self.fetch(url, "applications lookup").await?;
        let apps = response.json::<ApplicationsResponse>()?.applications;

        Ok(apps
            .applications
            .into_iter()
            .map(|app| (app.name.clone(), app))
            .collect())
    }

    async fn fetch(&self, url: String, context: &str) -> Result<HttpResponse> {
        let response = self.transport.execute(HttpRequest::get(&url)).await?;
        if response.status != 200 {
            return Err(BeaconError::Protocol {
                status: response.status,
                context: format!("{} {}", context, url),
                body: response.body,
            });
        }
        Ok(response)
    }
}
