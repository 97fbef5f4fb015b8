use cf_client::models::Quota;
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::gauge_vec;
use crate::config::MetricsConfig;
use crate::error::Result;

/// Quota limits shared by organizations and spaces. Absent limits are
/// exported as -1, an absent paid-services flag as 0.
pub(crate) struct QuotaMetrics {
    non_basic_services_allowed: GaugeVec,
    instance_memory_mb_limit: GaugeVec,
    total_app_instances_quota: GaugeVec,
    total_app_tasks_quota: GaugeVec,
    total_memory_mb_quota: GaugeVec,
    total_private_domains_quota: Option<GaugeVec>,
    total_reserved_route_ports_quota: GaugeVec,
    total_routes_quota: GaugeVec,
    total_services_quota: GaugeVec,
    total_service_keys_quota: GaugeVec,
}

fn limit(value: Option<i64>) -> f64 {
    value.map(|v| v as f64).unwrap_or(-1.0)
}

impl QuotaMetrics {
    /// `owner` is the singular subsystem, e.g. `organization`.
    pub fn new(
        config: &MetricsConfig,
        owner: &str,
        labels: &[&str],
        with_private_domains: bool,
    ) -> Result<Self> {
        let gauge = |name: &str, help: &str| {
            gauge_vec(
                config,
                owner,
                name,
                &format!("Cloud Foundry {} {}.", owner, help),
                labels,
            )
        };
        Ok(Self {
            non_basic_services_allowed: gauge(
                "non_basic_services_allowed",
                "quota allows paid service plans (1 allowed, 0 not allowed)",
            )?,
            instance_memory_mb_limit: gauge(
                "instance_memory_mb_limit",
                "quota maximum memory per application instance (-1 unlimited)",
            )?,
            total_app_instances_quota: gauge(
                "total_app_instances_quota",
                "quota total number of application instances (-1 unlimited)",
            )?,
            total_app_tasks_quota: gauge(
                "total_app_tasks_quota",
                "quota total number of tasks per application (-1 unlimited)",
            )?,
            total_memory_mb_quota: gauge(
                "total_memory_mb_quota",
                "quota total amount of memory in MB (-1 unlimited)",
            )?,
            total_private_domains_quota: if with_private_domains {
                Some(gauge(
                    "total_private_domains_quota",
                    "quota total number of private domains (-1 unlimited)",
                )?)
            } else {
                None
            },
            total_reserved_route_ports_quota: gauge(
                "total_reserved_route_ports_quota",
                "quota total number of reserved route ports (-1 unlimited)",
            )?,
            total_routes_quota: gauge(
                "total_routes_quota",
                "quota total number of routes (-1 unlimited)",
            )?,
            total_services_quota: gauge(
                "total_services_quota",
                "quota total number of service instances (-1 unlimited)",
            )?,
            total_service_keys_quota: gauge(
                "total_service_keys_quota",
                "quota total number of service keys (-1 unlimited)",
            )?,
        })
    }

    pub fn set(&self, labels: &[&str], quota: &Quota) {
        let paid = quota.services.paid_services_allowed.unwrap_or(false);
        self.non_basic_services_allowed
            .with_label_values(labels)
            .set(if paid { 1.0 } else { 0.0 });
        self.instance_memory_mb_limit
            .with_label_values(labels)
            .set(limit(quota.apps.per_process_memory_in_mb));
        self.total_app_instances_quota
            .with_label_values(labels)
            .set(limit(quota.apps.total_instances));
        self.total_app_tasks_quota
            .with_label_values(labels)
            .set(limit(quota.apps.per_app_tasks));
        self.total_memory_mb_quota
            .with_label_values(labels)
            .set(limit(quota.apps.total_memory_in_mb));
        if let Some(domains) = &self.total_private_domains_quota {
            domains
                .with_label_values(labels)
                .set(limit(quota.domains.total_domains));
        }
        self.total_reserved_route_ports_quota
            .with_label_values(labels)
            .set(limit(quota.routes.total_reserved_ports));
        self.total_routes_quota
            .with_label_values(labels)
            .set(limit(quota.routes.total_routes));
        self.total_services_quota
            .with_label_values(labels)
            .set(limit(quota.services.total_service_instances));
        self.total_service_keys_quota
            .with_label_values(labels)
            .set(limit(quota.services.total_service_keys));
    }

    pub fn reset(&self) {
        for gauge in self.gauges() {
            gauge.reset();
        }
    }

    pub fn collectors(&self) -> Vec<&dyn Collector> {
        self.gauges()
            .into_iter()
            .map(|g| g as &dyn Collector)
            .collect()
    }

    fn gauges(&self) -> Vec<&GaugeVec> {
        let mut gauges = vec![
            &self.non_basic_services_allowed,
            &self.instance_memory_mb_limit,
            &self.total_app_instances_quota,
            &self.total_app_tasks_quota,
            &self.total_memory_mb_quota,
            &self.total_reserved_route_ports_quota,
            &self.total_routes_quota,
            &self.total_services_quota,
            &self.total_service_keys_quota,
        ];
        if let Some(domains) = &self.total_private_domains_quota {
            gauges.push(domains);
        }
        gauges
    }
}
