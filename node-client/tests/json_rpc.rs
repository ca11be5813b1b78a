//! JSON-RPC connector tests against a mock HTTP node

use node_client::{
    Address, Error, JsonRpcClient, JsonRpcConfig, KeyPairSigner, RpcClient, SignedTransaction,
    Signer, TxHash, UnsignedTransaction,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> JsonRpcClient {
    JsonRpcClient::new(JsonRpcConfig {
        endpoint: server.uri(),
        request_timeout_seconds: 5,
        poll_interval_ms: 20,
    })
    .unwrap()
}

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result,
    }))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message },
    }))
}

async fn mount(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(response)
        .mount(server)
        .await;
}

fn signed_payload() -> SignedTransaction {
    let signer = KeyPairSigner::from_seed(&[3u8; 32]);
    signer
        .sign(&UnsignedTransaction {
            from: signer.address(),
            to: Address::from_bytes([5; 20]),
            value: 0,
            gas_limit: 100_000,
            gas_price: 1,
            nonce: 0,
            chain_id: 1337,
            data: bytes::Bytes::new(),
        })
        .unwrap()
}

fn receipt_json(hash: TxHash, status: &str) -> serde_json::Value {
    json!({
        "transactionHash": hash,
        "status": status,
        "blockNumber": "0x2",
        "gasUsed": "0xc350",
        "logs": []
    })
}

#[tokio::test]
async fn test_nonce_and_gas_price() {
    let server = MockServer::start().await;
    mount(&server, "eth_getTransactionCount", rpc_result(json!("0x2a"))).await;
    mount(&server, "eth_gasPrice", rpc_result(json!("0x4a817c800"))).await;

    let client = client_for(&server);
    assert_eq!(client.nonce(Address::from_bytes([1; 20])).await.unwrap(), 42);
    assert_eq!(client.gas_price().await.unwrap(), 20_000_000_000);
}

#[tokio::test]
async fn test_submit_returns_node_hash() {
    let server = MockServer::start().await;
    let signed = signed_payload();
    mount(&server, "eth_sendRawTransaction", rpc_result(json!(signed.hash()))).await;

    let client = client_for(&server);
    assert_eq!(client.submit(&signed).await.unwrap(), signed.hash());
}

#[tokio::test]
async fn test_submit_classifies_nonce_rejection() {
    let server = MockServer::start().await;
    mount(
        &server,
        "eth_sendRawTransaction",
        rpc_error(-32000, "nonce too low"),
    )
    .await;

    let client = client_for(&server);
    let err = client.submit(&signed_payload()).await.unwrap_err();
    assert!(err.is_nonce_mismatch());
}

#[tokio::test]
async fn test_submit_other_rejection() {
    let server = MockServer::start().await;
    mount(
        &server,
        "eth_sendRawTransaction",
        rpc_error(-32000, "insufficient funds for gas * price + value"),
    )
    .await;

    let client = client_for(&server);
    let err = client.submit(&signed_payload()).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));
}

#[tokio::test]
async fn test_await_receipt_polls_until_mined() {
    let server = MockServer::start().await;
    let hash = signed_payload().hash();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
        .respond_with(rpc_result(serde_json::Value::Null))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(receipt_json(hash, "0x1")),
    )
    .await;

    let client = client_for(&server);
    let receipt = client
        .await_receipt(hash, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(receipt.success);
    assert_eq!(receipt.transaction_hash, hash);
    assert_eq!(receipt.gas_used, 50_000);
}

#[tokio::test]
async fn test_await_receipt_survives_failed_poll() {
    let server = MockServer::start().await;
    let hash = signed_payload().hash();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
        .respond_with(rpc_error(-32000, "header not found"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(receipt_json(hash, "0x1")),
    )
    .await;

    let client = client_for(&server);
    let receipt = client
        .await_receipt(hash, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(receipt.success);
    assert_eq!(receipt.transaction_hash, hash);
}

#[tokio::test]
async fn test_await_receipt_rejects_malformed_receipt() {
    let server = MockServer::start().await;
    let hash = signed_payload().hash();
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(json!({ "transactionHash": hash, "logs": [] })),
    )
    .await;

    let client = client_for(&server);
    let err = client
        .await_receipt(hash, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
}

#[tokio::test]
async fn test_await_receipt_reports_revert() {
    let server = MockServer::start().await;
    let hash = signed_payload().hash();
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(receipt_json(hash, "0x0")),
    )
    .await;

    let client = client_for(&server);
    let receipt = client
        .await_receipt(hash, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(!receipt.success);
}

#[tokio::test]
async fn test_await_receipt_times_out() {
    let server = MockServer::start().await;
    mount(
        &server,
        "eth_getTransactionReceipt",
        rpc_result(serde_json::Value::Null),
    )
    .await;

    let client = client_for(&server);
    let hash = signed_payload().hash();
    let err = client
        .await_receipt(hash, Duration::from_millis(150))
        .await
        .unwrap_err();

    match err {
        Error::ConfirmationTimeout { hash: reported, .. } => assert_eq!(reported, hash),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.gas_price().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn test_unreachable_node_is_transport_error() {
    let client = JsonRpcClient::new(JsonRpcConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        request_timeout_seconds: 2,
        poll_interval_ms: 20,
    })
    .unwrap();

    let err = client.nonce(Address::ZERO).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn test_call_and_balance() {
    let server = MockServer::start().await;
    mount(
        &server,
        "eth_call",
        rpc_result(json!(format!("0x{:064x}", 1_000u64))),
    )
    .await;
    mount(&server, "eth_getBalance", rpc_result(json!("0xde0b6b3a7640000"))).await;

    let client = client_for(&server);
    let output = client.call(Address::from_bytes([7; 20]), &[0x70, 0xa0, 0x82, 0x31]).await.unwrap();
    assert_eq!(output.len(), 32);
    assert_eq!(output[31], 0xe8);

    let balance = client.balance(Address::from_bytes([1; 20])).await.unwrap();
    assert_eq!(balance, 1_000_000_000_000_000_000);
}

#[tokio::test]
async fn test_call_revert_reason_is_kept() {
    let server = MockServer::start().await;
    mount(
        &server,
        "eth_call",
        rpc_error(3, "execution reverted: Pool already exists"),
    )
    .await;

    let client = client_for(&server);
    let err = client
        .call(Address::from_bytes([7; 20]), &[0x00, 0x01, 0x02, 0x03])
        .await
        .unwrap_err();

    match err {
        Error::Rpc { code, message } => {
            assert_eq!(code, 3);
            assert!(message.contains("Pool already exists"));
        }
        other => panic!("expected rpc error, got {:?}", other),
    }
}
