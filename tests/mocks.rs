use std::{fmt, error::Error as StdError, io::Error as IoError, sync::Arc, time::Duration};
use handler_mocks::{
    assert::{MessageCheck, NextExpectation},
    deferred,
    response::ResponseMethod,
    Deferred,
    MockRequest,
    MockResponse,
    Mocks,
    Next,
    TerminalAction
};
use regex::Regex;
use serde_json::{json, Value};

#[derive(Debug)]
struct SomeError(&'static str);

#[derive(Debug)]
struct OtherError(&'static str);

impl fmt::Display for SomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Display for OtherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl StdError for SomeError {}
impl StdError for OtherError {}

fn async_service_router(req: MockRequest, res: MockResponse, _next: Next) -> Deferred {
    deferred(async move {
        tokio::task::yield_now().await;
        let ok = req.query_value("value").as_ref().and_then(Value::as_str) == Some("ok");
        res.json(json!({ "test": ok }));
    })
}

#[tokio::test]
async fn it_calls_handler_with_stand_ins() {
    let mocks = Mocks::new();
    let expected = mocks.clone();

    mocks
        .test(move |req, res, next| {
            assert!(req.ptr_eq(&expected.req));
            assert!(res.ptr_eq(&expected.res));
            assert!(next.ptr_eq(&expected.next));
            deferred(async {})
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn it_calls_error_handler_with_stand_ins_and_error() {
    let mocks = Mocks::new();
    let error = Arc::new(IoError::other("fail"));
    let expected = error.clone();

    mocks
        .test_error(move |err: Arc<IoError>, _req, _res, next| {
            assert!(Arc::ptr_eq(&err, &expected));
            next.shared_error(err);
        }, error.clone())
        .expect_next_error(&error)
        .await
        .unwrap();
}

#[tokio::test]
async fn it_checks_json_response() {
    Mocks::new()
        .test(async_service_router)
        .expect_json(json!({ "test": false }))
        .await
        .unwrap();
}

#[tokio::test]
async fn it_passes_modified_request() {
    let mocks = Mocks::new();
    mocks.req.data().query.insert("value".into(), json!("ok"));

    mocks
        .test(async_service_router)
        .expect_json(json!({ "test": true }))
        .await
        .unwrap();
}

#[tokio::test]
async fn it_passes_redirect_check() {
    Mocks::new()
        .test(|_req, res, _next| {
            res.redirect("/other/url");
        })
        .expect_redirect("/other/url")
        .await
        .unwrap();
}

#[tokio::test]
async fn it_fails_redirect_check() {
    let err = Mocks::new()
        .test(|_req, res, _next| {
            res.redirect("/wrong/url");
        })
        .expect_redirect("/other/url")
        .await
        .unwrap_err();

    assert!(err.is_assertion());
    assert!(err.to_string().contains("/wrong/url"));
}

#[tokio::test]
async fn it_tests_sync_handlers_with_same_api() {
    Mocks::new()
        .test(|_req, res, _next| {
            res.send_status(404);
        })
        .expect_send_status(404)
        .await
        .unwrap();
}

#[tokio::test]
async fn it_tests_handlers_returning_deferred_after_terminal_call() {
    Mocks::new()
        .test(|_req, res, _next| {
            res.send_status(404);
            deferred(async {})
        })
        .expect_send_status(404)
        .await
        .unwrap();
}

#[tokio::test]
async fn it_resolves_to_mocks() {
    let mocks = Mocks::new();

    let settled = mocks.test(async_service_router).await.unwrap();

    assert!(settled.ptr_eq(&mocks));
    assert!(mocks.res.stub(ResponseMethod::Json).called());
}

#[tokio::test]
async fn it_resolves_to_mocks_after_expectation() {
    let mocks = Mocks::new();

    let settled = mocks
        .test(async_service_router)
        .expect_json(json!({ "test": false }))
        .await
        .unwrap();

    assert!(settled.ptr_eq(&mocks));
}

#[tokio::test]
async fn it_chains_expectations() {
    let mocks = Mocks::new()
        .test(|_req, res, _next| {
            res.status(404).send("Not found");
        })
        .expect_status(404)
        .expect_send("Not found")
        .await
        .unwrap();

    assert!(mocks.res.stub(ResponseMethod::Json).not_called());
}

#[tokio::test]
async fn it_checks_send_without_arguments() {
    Mocks::new()
        .test(|_req, res, _next| {
            res.status(404).send(());
        })
        .expect_status(404)
        .expect_send(())
        .await
        .unwrap();
}

#[tokio::test]
async fn it_reports_other_terminal_action_by_name() {
    let root = Mocks::new().test(|_req, res, _next| {
        res.status(404).send(());
    });

    root.expect_status(404).expect_send(()).await.unwrap();

    let err = root.expect_json(json!({})).await.unwrap_err();
    assert!(err.is_exclusivity());
    assert_eq!(err.to_string(), "json() call was expected, but (also?) send() was called");
}

#[tokio::test]
async fn it_reports_repeated_terminal_action() {
    let err = Mocks::new()
        .test(|_req, res, _next| {
            res.send("a").send("b");
        })
        .expect_send("a")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "send() called more than once");
}

#[tokio::test]
async fn it_checks_other_terminal_actions() {
    Mocks::new()
        .test(|_req, res, _next| {
            res.content_type("html").render(("index", json!({ "title": "Home" })));
        })
        .expect_type("html")
        .expect_render("index")
        .await
        .unwrap();

    Mocks::new()
        .test(|_req, res, _next| {
            res.send_file(("/tmp/report.pdf", json!({ "maxAge": 0 })));
        })
        .expect_send_file("/tmp/report.pdf")
        .await
        .unwrap();

    Mocks::new()
        .test(|_req, res, _next| {
            res.download(("/tmp/report.pdf", "report.pdf"));
        })
        .expect_download(("/tmp/report.pdf", "report.pdf"))
        .await
        .unwrap();

    Mocks::new()
        .test(|_req, res, _next| {
            res.jsonp(json!([1, 2]));
        })
        .expect_jsonp(json!([1, 2]))
        .await
        .unwrap();

    let err = Mocks::new()
        .test(|_req, res, _next| {
            res.end("done");
        })
        .expect_end(())
        .await
        .unwrap_err();
    assert!(err.is_assertion());
}

#[tokio::test]
async fn it_checks_next_without_argument() {
    Mocks::new()
        .test(|_req, _res, next| next.call())
        .expect_next()
        .await
        .unwrap();
}

#[tokio::test]
async fn it_treats_null_and_falsy_next_arguments_as_absent() {
    Mocks::new()
        .test(|_req, _res, next| next.call_with(Value::Null))
        .expect_next()
        .await
        .unwrap();

    Mocks::new()
        .test(|_req, _res, next| next.call_with(json!(false)))
        .expect_next()
        .await
        .unwrap();
}

#[tokio::test]
async fn it_rejects_next_argument_when_none_expected() {
    let err = Mocks::new()
        .test(|_req, _res, next| next.error(IoError::other("fail")))
        .expect_next()
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains(r#"expected call to next() without arguments, but got "Error: fail""#));
}

#[tokio::test]
async fn it_reports_missing_next_call() {
    let err = Mocks::new()
        .test(|_req, _res, _next| deferred(async {}))
        .expect_next()
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "next() not called as expected");
}

#[tokio::test]
async fn it_checks_next_with_error_type() {
    Mocks::new()
        .test(|_req, _res, next| next.error(SomeError("Bla")))
        .expect_next_of::<SomeError>()
        .expect_next_with(NextExpectation::of::<SomeError>(), "Bla")
        .await
        .unwrap();
}

#[tokio::test]
async fn it_checks_next_with_error_instance() {
    let error = Arc::new(SomeError("Bla"));
    let passed = error.clone();

    Mocks::new()
        .test(move |_req, _res, next| next.shared_error(passed))
        .expect_next_error(&error)
        .await
        .unwrap();
}

#[tokio::test]
async fn it_checks_next_with_predicate() {
    let check = MessageCheck::predicate(|arg| match arg.downcast_ref::<SomeError>() {
        Some(err) if err.0 == "fail" => Ok(()),
        _ => Err(format!("unexpected argument {arg}")),
    });

    Mocks::new()
        .test(|_req, _res, next| next.error(SomeError("fail")))
        .expect_next_with(NextExpectation::of::<SomeError>(), check)
        .await
        .unwrap();
}

#[tokio::test]
async fn it_checks_next_with_pattern_and_route_token() {
    Mocks::new()
        .test(|_req, _res, next| next.error(SomeError("user 42 not found")))
        .expect_next_with(
            NextExpectation::of::<SomeError>(),
            Regex::new(r"^user \d+ not found$").unwrap()
        )
        .await
        .unwrap();

    Mocks::new()
        .test(|_req, _res, next| next.route())
        .expect_next_message("route")
        .await
        .unwrap();
}

#[tokio::test]
async fn it_fails_on_wrong_next_error_type() {
    let err = Mocks::new()
        .test(|_req, _res, next| next.error(SomeError("Bla")))
        .expect_next_of::<OtherError>()
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "expected next to have been called with instance of OtherError");
}

#[tokio::test]
async fn it_fails_on_wrong_next_error_message() {
    let err = Mocks::new()
        .test(|_req, _res, next| next.error(SomeError("Bla")))
        .expect_next_with(NextExpectation::of::<SomeError>(), "Blubb")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), r#"expected error message to include "Blubb", but got "Bla""#);
}

#[tokio::test]
async fn it_fails_next_expectation_without_argument() {
    let err = Mocks::new()
        .test(|_req, _res, next| next.call())
        .expect_next_of::<SomeError>()
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "expected next to have been called with any argument, but was called without"
    );
}

#[tokio::test]
async fn it_checks_header_set_either_way() {
    Mocks::new()
        .test(|_req, res, _next| {
            res.set("X-My-Header", "myValue").end(());
        })
        .expect_header("X-My-Header", "myValue")
        .await
        .unwrap();

    Mocks::new()
        .test(|_req, res, _next| {
            res.set_header("X-My-Header", "myValue").end(());
        })
        .expect_header("X-My-Header", "myValue")
        .await
        .unwrap();
}

#[tokio::test]
async fn it_fails_header_check_when_not_set() {
    let err = Mocks::new()
        .test(|_req, res, _next| {
            res.header("X-My-Header", "myValue").end(());
        })
        .expect_header("X-My-Header", "myValue")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Expected header 'X-My-Header' to have been set to 'myValue'");
}

#[tokio::test]
async fn it_waits_for_terminal_call_after_return() {
    let mocks = Mocks::new();

    let settled = mocks
        .test(|_req, res, _next| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                res.json(json!({ "late": true }));
            });
        })
        .expect_json(json!({ "late": true }))
        .await
        .unwrap();

    assert_eq!(settled.call_count(TerminalAction::Json), 1);
}

#[tokio::test]
async fn it_lets_deferred_value_own_completion() {
    let mocks = Mocks::new();

    mocks
        .test(|_req, res, _next| {
            res.json(json!({ "id": 1 }));
            deferred(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                res.set_local("audited", true);
            })
        })
        .expect_json(json!({ "id": 1 }))
        .await
        .unwrap();

    assert_eq!(mocks.res.local("audited"), Some(json!(true)));
}

#[tokio::test]
async fn it_runs_deferred_value_returned_in_ok() {
    let mocks = Mocks::new();

    mocks
        .test(|_req, res, _next| -> Result<Deferred, IoError> {
            Ok(deferred(async move {
                res.json(json!({ "id": 2 }));
            }))
        })
        .expect_json(json!({ "id": 2 }))
        .await
        .unwrap();

    assert_eq!(mocks.call_count(TerminalAction::Json), 1);
}

#[tokio::test]
async fn it_waits_for_deferred_value_returned_in_ok_after_terminal_call() {
    let mocks = Mocks::new();

    mocks
        .test(|_req, res, _next| -> Result<Deferred, IoError> {
            res.json(json!({ "id": 3 }));
            Ok(deferred(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                res.set_local("audited", true);
            }))
        })
        .expect_json(json!({ "id": 3 }))
        .await
        .unwrap();

    assert_eq!(mocks.res.local("audited"), Some(json!(true)));
}

#[tokio::test]
async fn it_propagates_deferred_rejection_to_every_link() {
    let root = Mocks::new().test(|_req, res, _next| {
        deferred(async move {
            res.status(500);
            Err::<(), _>(IoError::other("service unavailable"))
        })
    });

    let first = root.expect_status(500).await.unwrap_err();
    let second = root.expect_json(json!({})).expect_status(500).await.unwrap_err();

    assert!(first.is_handler_error());
    assert_eq!(first.to_string(), "service unavailable");
    assert!(first.downcast_ref::<IoError>().is_some());
    assert!(first.ptr_eq(&second));
}

#[tokio::test]
async fn it_propagates_error_returned_by_handler() {
    let err = Mocks::new()
        .test(|_req, res, _next| {
            res.send("partial");
            Err::<(), _>(SomeError("broken"))
        })
        .expect_send("partial")
        .await
        .unwrap_err();

    assert!(err.is_handler_error());
    assert!(err.downcast_ref::<SomeError>().is_some());
}

#[tokio::test]
async fn it_stays_pending_when_handler_never_completes() {
    let pending = Mocks::new().test(|_req, _res, _next| {});

    let timed_out = tokio::time::timeout(Duration::from_millis(20), pending).await;

    assert!(timed_out.is_err());
}

#[tokio::test]
async fn it_yields_same_context_when_awaited_twice() {
    let link = Mocks::new()
        .test(|_req, res, _next| {
            res.status(404).send(());
        })
        .expect_send(());

    let first = link.clone().await.unwrap();
    let second = link.await.unwrap();

    assert!(first.ptr_eq(&second));
}
