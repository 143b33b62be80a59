mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ism_form::FormError;
use ism_model::{HttpMethod, ServerResponse};
use ism_service::notifications::{
    CHANNELS_REQUIRED, NO_PERMISSION_HINT, NO_PERMISSION_UPDATE, UPDATE_SUCCESS,
};
use ism_service::{NotificationSettings, ServiceError, Toast, ToastKind};
use serde_json::json;

use support::{MockCaller, data, engine_error, toasts};

fn lron_list() -> ServerResponse {
    ServerResponse::success(json!({
        "lron_configs": [
            {
                "_id": "LRON:indices:data/write/reindex",
                "lron_config": {
                    "lron_condition": { "success": true, "failure": false },
                    "channels": [{ "id": "chan-1" }],
                    "action_name": "indices:data/write/reindex"
                }
            },
            {
                "_id": "LRON:indices:admin/open",
                "lron_config": {
                    "lron_condition": { "success": false, "failure": false },
                    "channels": [],
                    "action_name": "indices:admin/open"
                }
            }
        ],
        "total_number": 2
    }))
}

fn is_get(request: &ism_model::ApiRequest) -> bool {
    request.method == HttpMethod::Get
}

#[tokio::test]
async fn load_flattens_configs() {
    let caller = MockCaller::new(|_| lron_list());
    let log = toasts();
    let mut page = NotificationSettings::new(caller.clone(), log.clone());

    page.load().await.unwrap();

    let rows = page.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title, "reindex");
    assert_eq!(rows[0].channels, vec!["chan-1".to_string()]);
    assert_eq!(rows[1].title, "open");
    assert_eq!(page.unsaved_count(), 0);
    assert!(!page.tracker().is_loading());
    assert!(log.drain().is_empty());

    let requests = caller.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].endpoint, "transport.request");
    assert_eq!(data(&requests[0], "path"), "/_plugins/_im/lron");
}

#[tokio::test]
async fn reload_with_fewer_rows_drops_their_fields() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let caller = MockCaller::new(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return lron_list();
        }
        let mut list = lron_list();
        if let Some(configs) = list
            .response
            .as_mut()
            .and_then(|body| body["lron_configs"].as_array_mut())
        {
            configs.truncate(1);
        }
        list
    });
    let mut page = NotificationSettings::new(caller, toasts());

    page.load().await.unwrap();
    assert_eq!(page.registry().registered_paths().len(), 6);
    page.load().await.unwrap();

    let paths: Vec<String> = page
        .registry()
        .registered_paths()
        .iter()
        .map(|path| path.dotted())
        .collect();
    assert_eq!(
        paths,
        ["dataSource.0.channels", "dataSource.0.failure", "dataSource.0.success"]
    );
    assert_eq!(page.rows().len(), 1);
}

#[tokio::test]
async fn forbidden_load_sets_no_permission() {
    let caller = MockCaller::new(|_| engine_error(403, "security_exception", "no permissions"));
    let log = toasts();
    let mut page = NotificationSettings::new(caller, log.clone());

    let err = page.load().await.unwrap_err();

    assert!(matches!(err, ServiceError::NoPermission(_)));
    assert!(page.has_no_permission());
    assert!(page.rows().is_empty());
    assert!(log.drain().is_empty());
}

#[tokio::test]
async fn failed_load_shows_the_error() {
    let caller = MockCaller::new(|_| engine_error(500, "exception", "boom"));
    let log = toasts();
    let mut page = NotificationSettings::new(caller, log.clone());

    let err = page.load().await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Api {
            status: Some(500),
            ..
        }
    ));
    assert!(!page.has_no_permission());
    assert_eq!(log.drain(), vec![(ToastKind::Danger, Toast::new("boom"))]);
}

#[tokio::test]
async fn submit_writes_every_row_and_reloads() {
    let caller = MockCaller::new(|request| {
        if is_get(request) {
            lron_list()
        } else {
            ServerResponse::success(json!({ "result": "updated" }))
        }
    });
    let log = toasts();
    let mut page = NotificationSettings::new(caller.clone(), log.clone());
    page.load().await.unwrap();

    page.set_failure(1, true).unwrap();
    page.set_channels(1, &["chan-2".to_string()]).unwrap();
    assert_eq!(page.unsaved_count(), 1);

    page.submit().await.unwrap();

    let requests = caller.requests();
    let methods: Vec<_> = requests.iter().map(|r| r.method).collect();
    assert_eq!(
        methods,
        vec![HttpMethod::Get, HttpMethod::Put, HttpMethod::Put, HttpMethod::Get]
    );
    assert_eq!(
        data(&requests[1], "path"),
        "/_plugins/_im/lron/LRON%3Aindices%3Adata%2Fwrite%2Freindex"
    );
    assert_eq!(
        data(&requests[2], "path"),
        "/_plugins/_im/lron/LRON%3Aindices%3Aadmin%2Fopen"
    );
    assert_eq!(
        data(&requests[2], "body"),
        &json!({
            "lron_config": {
                "lron_condition": { "success": false, "failure": true },
                "channels": [{ "id": "chan-2" }],
                "action_name": "indices:admin/open"
            }
        })
    );
    assert_eq!(
        log.drain(),
        vec![(ToastKind::Success, Toast::new(UPDATE_SUCCESS))]
    );
    assert_eq!(page.unsaved_count(), 0);
    assert!(!page.tracker().is_saving());
}

#[tokio::test]
async fn missing_channels_block_submit() {
    let caller = MockCaller::new(|_| lron_list());
    let log = toasts();
    let mut page = NotificationSettings::new(caller.clone(), log.clone());
    page.load().await.unwrap();

    page.set_failure(1, true).unwrap();
    let err = page.submit().await.unwrap_err();

    let ServiceError::Validation(FormError::ValidationFailed { errors }) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["dataSource.1.channels"], CHANNELS_REQUIRED);
    assert_eq!(caller.requests().len(), 1);
    assert!(log.drain().is_empty());
}

#[tokio::test]
async fn security_exception_on_write_shows_hint() {
    let caller = MockCaller::new(|request| {
        if is_get(request) {
            lron_list()
        } else {
            engine_error(403, "security_exception", "no permissions for [cluster:admin/lron]")
        }
    });
    let log = toasts();
    let mut page = NotificationSettings::new(caller, log.clone());
    page.load().await.unwrap();
    page.set_success(1, true).unwrap();
    page.set_channels(1, &["chan-1".to_string()]).unwrap();

    let err = page.submit().await.unwrap_err();

    assert!(matches!(err, ServiceError::NoPermission(_)));
    assert_eq!(
        log.drain(),
        vec![(
            ToastKind::Danger,
            Toast::new(NO_PERMISSION_UPDATE).with_text(NO_PERMISSION_HINT)
        )]
    );
    // Edits survive a failed save.
    assert_eq!(page.unsaved_count(), 1);
}

#[tokio::test]
async fn bare_failure_envelope_is_an_error() {
    let caller = MockCaller::new(|request| {
        if is_get(request) {
            lron_list()
        } else {
            ServerResponse {
                ok: false,
                response: None,
                error: None,
                body: None,
            }
        }
    });
    let log = toasts();
    let mut page = NotificationSettings::new(caller.clone(), log.clone());
    page.load().await.unwrap();

    let err = page.submit().await.unwrap_err();

    assert!(matches!(err, ServiceError::Api { status: None, .. }));
    assert_eq!(
        log.drain(),
        vec![(ToastKind::Danger, Toast::new("Request failed"))]
    );
    // No reload after a failed save.
    assert_eq!(caller.requests().len(), 3);
}

#[tokio::test]
async fn cancel_discards_edits() {
    let caller = MockCaller::new(|_| lron_list());
    let mut page = NotificationSettings::new(caller, toasts());
    page.load().await.unwrap();

    page.set_success(1, true).unwrap();
    page.set_channels(1, &["chan-9".to_string()]).unwrap();
    assert_eq!(page.unsaved_count(), 1);

    page.cancel();

    assert_eq!(page.unsaved_count(), 0);
    let rows = page.rows();
    assert!(!rows[1].success);
    assert!(rows[1].channels.is_empty());
}

#[tokio::test]
async fn detached_page_drops_late_load() {
    let caller = MockCaller::new(|_| lron_list());
    let mut page = NotificationSettings::new(caller.clone(), toasts());
    page.detach();

    page.load().await.unwrap();

    assert_eq!(caller.requests().len(), 1);
    assert!(page.rows().is_empty());
}
