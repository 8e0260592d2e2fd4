// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery, reconciliation, sensor polling and token refresh.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{Call, FakeGateway, device, sensor};
use rand::SeedableRng;
use rand::rngs::StdRng;
use telldus_bridge::auth::TokenManager;
use telldus_bridge::cache::CacheKey;
use telldus_bridge::host::{AccessoryId, Characteristic, ValueStore};
use telldus_bridge::platform::{Platform, PlatformConfig, SensorOverride};
use telldus_bridge::sensor::{SensorKind, SensorPoller, SensorSettings};
use telldus_bridge::types::DeviceStateCode;

fn porch() -> serde_json::Value {
    serde_json::json!({ "id": 4, "name": "Porch", "methods": 3, "state": 1 })
}

fn platform(
    gateway: FakeGateway,
    config: PlatformConfig,
) -> (Arc<FakeGateway>, Arc<ValueStore>, Platform<FakeGateway>) {
    let gateway = Arc::new(gateway);
    let host = Arc::new(ValueStore::new());
    let platform = Platform::with_gateway(config, Arc::clone(&gateway), host.clone()).unwrap();
    (gateway, host, platform)
}

// ============================================================================
// Discovery
// ============================================================================

mod discovery {
    use super::*;

    #[tokio::test]
    async fn registers_devices_and_sensors() {
        let gateway = FakeGateway::new()
            .with_device(device(porch()))
            .with_device(device(serde_json::json!({ "id": 7, "name": "Shed", "state": 2 })))
            .with_sensor(sensor(serde_json::json!({
                "id": 11, "name": "Attic", "model": "temperaturehumidity",
                "data": [{"name": "temp", "value": 21.0}, {"name": "humidity", "value": 40}]
            })));
        let config = PlatformConfig {
            ignore_devices: vec![7],
            ..PlatformConfig::new("gw", "t")
        };
        let (_, host, platform) = platform(gateway, config);

        let registry = platform.discover().await.unwrap();

        assert!(registry.dispatcher(4).is_some());
        assert!(registry.dispatcher(7).is_none());
        assert_eq!(
            registry.poller(11).map(|p| p.kind()),
            Some(SensorKind::TemperatureHumidity)
        );
        assert_eq!(
            platform.cache().get(CacheKey::gateway(4)),
            Some(DeviceStateCode::ON)
        );
        assert_eq!(
            platform.cache().get(CacheKey::issued(4)),
            Some(DeviceStateCode::ON)
        );
        assert_eq!(host.bool_value(AccessoryId::Device(4), Characteristic::On), Some(true));
        assert_eq!(
            host.text_value(AccessoryId::Device(4), Characteristic::Status).as_deref(),
            Some("Initialised")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_gateway_answers() {
        let gateway = FakeGateway::new().with_device(device(porch()));
        gateway.failing_lists.store(2, Ordering::SeqCst);
        let (gateway, _, platform) = platform(gateway, PlatformConfig::new("gw", "t"));

        let registry = platform.discover_with_retry().await.unwrap();

        assert!(registry.dispatcher(4).is_some());
        let lists = gateway
            .calls()
            .into_iter()
            .filter(|c| *c == Call::ListDevices)
            .count();
        assert_eq!(lists, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_retrying() {
        let gateway = FakeGateway::new();
        gateway.failing_lists.store(usize::MAX, Ordering::SeqCst);
        let (_, _, platform) = platform(gateway, PlatformConfig::new("gw", "t"));
        let platform = Arc::new(platform);

        let retry = {
            let platform = Arc::clone(&platform);
            tokio::spawn(async move { platform.discover_with_retry().await.is_some() })
        };
        tokio::time::sleep(Duration::from_secs(90)).await;
        platform.shutdown();

        assert!(!retry.await.unwrap());
        assert!(platform.is_shut_down());
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

mod reconciliation {
    use super::*;

    #[tokio::test]
    async fn external_switch_off_is_adopted() {
        let (gateway, host, platform) = platform(
            FakeGateway::new().with_device(device(porch())),
            PlatformConfig::new("gw", "t"),
        );
        let registry = platform.discover().await.unwrap();

        gateway.set_state(4, 2);
        let report = platform
            .reconciler()
            .reconcile(registry.dispatchers().map(Arc::as_ref))
            .await;

        assert_eq!(report.corrected, vec![4]);
        assert_eq!(platform.cache().get(CacheKey::gateway(4)), Some(DeviceStateCode::OFF));
        assert_eq!(platform.cache().get(CacheKey::issued(4)), Some(DeviceStateCode::OFF));
        assert_eq!(host.bool_value(AccessoryId::Device(4), Characteristic::On), Some(false));
        assert!(!registry.dispatcher(4).unwrap().snapshot().switch_on);
    }

    #[tokio::test]
    async fn steady_state_changes_nothing() {
        let (_, _, platform) = platform(
            FakeGateway::new().with_device(device(porch())),
            PlatformConfig::new("gw", "t"),
        );
        let registry = platform.discover().await.unwrap();

        let report = platform
            .reconciler()
            .reconcile(registry.dispatchers().map(Arc::as_ref))
            .await;

        assert_eq!(report.polled, 1);
        assert_eq!(report.changed, 0);
        assert!(report.corrected.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn device_in_flight_is_left_alone() {
        let (gateway, host, platform) = platform(
            FakeGateway::new().with_device(device(porch())),
            PlatformConfig::new("gw", "t"),
        );
        let registry = platform.discover().await.unwrap();
        let dispatcher = registry.dispatcher(4).unwrap();

        // issues "on" and enters the mute window
        dispatcher.set_on(true).await;
        gateway.set_state(4, 2);

        let report = platform
            .reconciler()
            .reconcile(registry.dispatchers().map(Arc::as_ref))
            .await;

        assert!(report.corrected.is_empty());
        assert_eq!(platform.cache().get(CacheKey::gateway(4)), Some(DeviceStateCode::OFF));
        assert_eq!(platform.cache().get(CacheKey::issued(4)), Some(DeviceStateCode::ON));
        assert_eq!(host.bool_value(AccessoryId::Device(4), Characteristic::On), Some(true));

        // after the mute window the drift is picked up
        tokio::time::sleep(Duration::from_secs(25)).await;
        let report = platform
            .reconciler()
            .reconcile(registry.dispatchers().map(Arc::as_ref))
            .await;
        assert_eq!(report.corrected, vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn external_switch_after_idle_day_is_adopted() {
        let (gateway, host, platform) = platform(
            FakeGateway::new().with_device(device(porch())),
            PlatformConfig::new("gw", "t"),
        );
        let registry = platform.discover().await.unwrap();
        let reconciler = platform.reconciler();

        // nobody touches the device for longer than the cache TTL
        for _ in 0..25 {
            tokio::time::advance(Duration::from_secs(3600)).await;
            let report = reconciler.reconcile(registry.dispatchers().map(Arc::as_ref)).await;
            assert!(report.corrected.is_empty());
        }
        assert_eq!(platform.cache().get(CacheKey::issued(4)), Some(DeviceStateCode::ON));

        gateway.set_state(4, 2);
        let report = reconciler.reconcile(registry.dispatchers().map(Arc::as_ref)).await;

        assert_eq!(report.corrected, vec![4]);
        assert_eq!(platform.cache().get(CacheKey::issued(4)), Some(DeviceStateCode::OFF));
        assert_eq!(host.bool_value(AccessoryId::Device(4), Characteristic::On), Some(false));
    }

    #[tokio::test]
    async fn failed_list_skips_the_pass() {
        let (gateway, _, platform) = platform(
            FakeGateway::new().with_device(device(porch())),
            PlatformConfig::new("gw", "t"),
        );
        let registry = platform.discover().await.unwrap();

        gateway.set_state(4, 2);
        gateway.failing_lists.store(1, Ordering::SeqCst);
        let report = platform
            .reconciler()
            .reconcile(registry.dispatchers().map(Arc::as_ref))
            .await;

        assert_eq!(report.polled, 0);
        assert_eq!(platform.cache().get(CacheKey::gateway(4)), Some(DeviceStateCode::ON));
    }

    #[tokio::test]
    async fn unlisted_device_is_fetched_individually() {
        let (gateway, _, platform) = platform(
            FakeGateway::new().with_device(device(porch())),
            PlatformConfig::new("gw", "t"),
        );
        let registry = platform.discover().await.unwrap();

        gateway.hide_from_list(4);
        gateway.set_state(4, 2);
        gateway.clear_calls();
        let report = platform
            .reconciler()
            .reconcile(registry.dispatchers().map(Arc::as_ref))
            .await;

        assert!(gateway.calls().contains(&Call::DeviceInfo(4)));
        assert_eq!(report.corrected, vec![4]);
    }
}

// ============================================================================
// Sensors
// ============================================================================

mod sensors {
    use super::*;

    #[tokio::test]
    async fn rain_poll_updates_host() {
        let info = sensor(serde_json::json!({
            "id": 3, "name": "Garden", "model": "",
            "data": [{"name": "rtot", "value": 350.5}, {"name": "rrate", "value": 0.0}]
        }));
        let gateway = Arc::new(FakeGateway::new().with_sensor(info.clone()));
        let host = Arc::new(ValueStore::new());

        let poller = SensorPoller::new(
            &info,
            gateway,
            host.clone(),
            SensorSettings::default(),
            &mut StdRng::seed_from_u64(1),
        );

        assert_eq!(poller.kind(), SensorKind::Rain);
        assert_eq!(poller.poll().await, 1);

        let id = AccessoryId::Sensor(3);
        assert_eq!(host.float_value(id, Characteristic::Rain24h), Some(350.5));
        assert_eq!(host.float_value(id, Characteristic::Rain1h), Some(0.0));
        assert_eq!(host.bool_value(id, Characteristic::Rain), Some(false));
    }

    #[tokio::test]
    async fn wind_poll_updates_host() {
        let info = sensor(serde_json::json!({
            "id": 8, "name": "Roof", "model": "",
            "data": [
                {"name": "wdir", "value": 112.5},
                {"name": "wavg", "value": 0.3},
                {"name": "wgust", "value": 0.7}
            ]
        }));
        let gateway = Arc::new(FakeGateway::new().with_sensor(info.clone()));
        let host = Arc::new(ValueStore::new());

        let poller = SensorPoller::new(
            &info,
            gateway,
            host.clone(),
            SensorSettings::default(),
            &mut StdRng::seed_from_u64(1),
        );
        poller.poll().await;

        let id = AccessoryId::Sensor(8);
        assert_eq!(host.text_value(id, Characteristic::WindDirection).as_deref(), Some("ESE"));
        assert_eq!(host.float_value(id, Characteristic::WindSpeed), Some(0.3));
        assert_eq!(host.float_value(id, Characteristic::MaximumWindSpeed), Some(0.7));
    }

    #[tokio::test]
    async fn temperature_offset_is_applied() {
        let info = sensor(serde_json::json!({
            "id": 11, "name": "Attic", "model": "temperature",
            "data": [{"name": "temp", "value": 20.0}]
        }));
        let gateway = Arc::new(FakeGateway::new().with_sensor(info.clone()));
        let host = Arc::new(ValueStore::new());

        let settings = SensorSettings {
            temperature_offset: -1.5,
            ..SensorSettings::default()
        };
        let poller = SensorPoller::new(&info, gateway, host.clone(), settings, &mut StdRng::seed_from_u64(1));
        poller.poll().await;

        assert_eq!(
            host.float_value(AccessoryId::Sensor(11), Characteristic::CurrentTemperature),
            Some(18.5)
        );
    }

    #[tokio::test]
    async fn random_heartrate_reuses_persisted_band() {
        use telldus_bridge::host::{AccessoryHost, CharacteristicValue};

        let info = sensor(serde_json::json!({ "id": 2, "data": [{"name": "temp", "value": 1}] }));
        let gateway = Arc::new(FakeGateway::new());
        let host = Arc::new(ValueStore::new());
        host.set_value(
            AccessoryId::Sensor(2),
            Characteristic::Heartrate,
            CharacteristicValue::Int(100),
        );

        let settings = SensorSettings {
            heartrate: 100,
            random_heartrate: true,
            ..SensorSettings::default()
        };
        let poller = SensorPoller::new(&info, gateway, host.clone(), settings, &mut StdRng::seed_from_u64(9));

        assert!((80..=120).contains(&poller.heartrate()));
        assert_eq!(
            host.float_value(AccessoryId::Sensor(2), Characteristic::Heartrate),
            Some(poller.heartrate() as f64)
        );
    }

    #[tokio::test]
    async fn random_heartrate_spreads_on_fresh_host() {
        let mut rates = std::collections::HashSet::new();
        for _ in 0..20 {
            let gateway = FakeGateway::new().with_sensor(sensor(serde_json::json!({
                "id": 11, "name": "Attic", "model": "temperature",
                "data": [{"name": "temp", "value": 20.0}]
            })));
            let mut config = PlatformConfig::new("gw", "t");
            config.sensors.insert(
                11,
                SensorOverride {
                    heartrate: 300,
                    random_heartrate: true,
                    ..SensorOverride::default()
                },
            );
            let (_, _, platform) = platform(gateway, config);

            let registry = platform.discover().await.unwrap();
            let rate = registry.poller(11).unwrap().heartrate();
            assert!((240..=360).contains(&rate), "{rate} outside band");
            rates.insert(rate);
        }
        assert!(rates.len() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_poll_is_skipped() {
        let info = sensor(serde_json::json!({
            "id": 11, "name": "Attic", "model": "temperature",
            "data": [{"name": "temp", "value": 20.0}]
        }));
        let gateway = Arc::new(
            FakeGateway::new()
                .with_sensor(info.clone())
                .with_sensor_latency(Duration::from_secs(4)),
        );
        let poller = Arc::new(SensorPoller::new(
            &info,
            Arc::clone(&gateway),
            Arc::new(ValueStore::new()),
            SensorSettings::default(),
            &mut StdRng::seed_from_u64(1),
        ));

        let slow = {
            let poller = Arc::clone(&poller);
            tokio::spawn(async move { poller.poll().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(poller.is_polling());

        assert_eq!(poller.poll().await, 0);
        assert_eq!(slow.await.unwrap(), 1);
        assert!(!poller.is_polling());
        assert_eq!(gateway.calls(), vec![Call::SensorInfo(11)]);

        // the next poll goes through again
        assert_eq!(poller.poll().await, 1);
    }

    #[tokio::test]
    async fn failed_poll_delivers_nothing() {
        let info = sensor(serde_json::json!({ "id": 5, "data": [{"name": "temp", "value": 1}] }));
        // the gateway does not know sensor 5
        let poller = SensorPoller::new(
            &info,
            Arc::new(FakeGateway::new()),
            Arc::new(ValueStore::new()),
            SensorSettings::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(poller.poll().await, 0);
    }
}

// ============================================================================
// Token refresh
// ============================================================================

mod token {
    use super::*;

    #[tokio::test]
    async fn refresh_when_due() {
        let gateway = FakeGateway::new();
        let mut manager = TokenManager::new(1_000, Some(2_000));

        assert!(!manager.refresh_if_due(&gateway, 1_500, Duration::from_secs(10)).await);
        assert!(gateway.calls().is_empty());

        assert!(manager.refresh_if_due(&gateway, 1_801, Duration::from_secs(10)).await);
        assert_eq!(manager.expires(), Some(2_000_000_000));
        assert_eq!(manager.next_refresh(), 1_801 + (2_000_000_000 - 1_801) * 8 / 10);
    }

    #[tokio::test]
    async fn failed_refresh_backs_off_one_beat() {
        let gateway = FakeGateway::new();
        gateway.fail_refresh.store(true, Ordering::SeqCst);
        let mut manager = TokenManager::new(1_000, Some(2_000));

        assert!(!manager.refresh_if_due(&gateway, 1_900, Duration::from_secs(10)).await);
        assert_eq!(manager.next_refresh(), 1_910);
        assert!(!manager.is_due(1_905));
        assert_eq!(manager.expires(), Some(2_000));
    }
}

// ============================================================================
// Heartbeat
// ============================================================================

mod heartbeat {
    use super::*;

    fn count(gateway: &FakeGateway, call: &Call) -> usize {
        gateway.calls().iter().filter(|c| *c == call).count()
    }

    #[tokio::test(start_paused = true)]
    async fn run_schedules_polls_reconciliation_and_token_refresh() {
        let gateway = FakeGateway::new()
            .with_device(device(porch()))
            .with_sensor(sensor(serde_json::json!({
                "id": 11, "name": "Attic", "model": "temperature",
                "data": [{"name": "temp", "value": 20.0}]
            })));
        let mut config = PlatformConfig {
            beat_rate: 5,
            ..PlatformConfig::new("gw", "t")
        };
        config.sensors.insert(
            11,
            SensorOverride {
                heartrate: 3,
                ..SensorOverride::default()
            },
        );
        let (gateway, _, platform) = platform(gateway, config);
        let platform = Arc::new(platform);

        let run = {
            let platform = Arc::clone(&platform);
            tokio::spawn(async move { platform.run().await })
        };

        // discovery only
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count(&gateway, &Call::SensorInfo(11)), 1);
        assert_eq!(count(&gateway, &Call::ListDevices), 1);
        assert_eq!(count(&gateway, &Call::RefreshToken), 0);

        // tick 3 polls the sensor
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count(&gateway, &Call::SensorInfo(11)), 2);
        assert_eq!(count(&gateway, &Call::ListDevices), 1);

        // tick 5 reconciles and refreshes the token of unknown expiry
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count(&gateway, &Call::ListDevices), 2);
        assert_eq!(count(&gateway, &Call::RefreshToken), 1);

        // ticks 6, 9 poll; tick 10 reconciles; the new token is not due yet
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count(&gateway, &Call::SensorInfo(11)), 4);
        assert_eq!(count(&gateway, &Call::ListDevices), 3);
        assert_eq!(count(&gateway, &Call::RefreshToken), 1);

        platform.shutdown();
        run.await.unwrap();
    }
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_cache_and_stops_heartbeat() {
    let (_, _, platform) = platform(
        FakeGateway::new().with_device(device(porch())),
        PlatformConfig::new("gw", "t"),
    );
    let platform = Arc::new(platform);

    let run = {
        let platform = Arc::clone(&platform);
        tokio::spawn(async move { platform.run().await })
    };
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(platform.cache().get(CacheKey::gateway(4)).is_some());

    platform.shutdown();
    run.await.unwrap();

    assert!(platform.cache().get(CacheKey::gateway(4)).is_none());
}
