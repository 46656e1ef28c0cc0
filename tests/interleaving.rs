//! 处理进行中到达的消息与变更

use smartreader::dom::find_nodes;
use smartreader::engine::MutationBatch;
use smartreader::{Message, Response};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{reader, HtmlTestHelper, TestConfigBuilder};

fn paragraphs(count: usize) -> String {
    "<p>alpha beta gamma</p>".repeat(count)
}

fn assert_each_paragraph_emphasised_once(page: &smartreader::Page) {
    for p in find_nodes(page.document(), &["p"]) {
        let html = String::from_utf8(smartreader::dom::serialize_document(&p, "").unwrap())
            .unwrap();
        assert_eq!(html, "<b>al</b>pha <b>be</b>ta <b>ga</b>mma");
    }
}

#[tokio::test]
async fn test_disable_during_pass_leaves_page_plain() {
    let reader = reader(&paragraphs(6), TestConfigBuilder::new().with_batch_size(1).build());
    let page = reader.page().clone();
    let original = HtmlTestHelper::body_text(&page);

    let (summary, _) = tokio::join!(reader.on_load(), async {
        tokio::task::yield_now().await;
        reader.disable().await
    });

    let summary = summary.expect("enabled at load");
    assert!(!summary.recorded);
    assert_eq!(HtmlTestHelper::count_tags(&page, "b"), 0);
    assert_eq!(HtmlTestHelper::body_text(&page), original);
    assert!(!reader.is_enabled().await);
    assert_eq!(reader.stats().total_processed, 0);
}

#[tokio::test]
async fn test_disable_then_enable_during_pass() {
    let reader = reader(&paragraphs(6), TestConfigBuilder::new().with_batch_size(1).build());
    let page = reader.page().clone();

    tokio::join!(reader.on_load(), async {
        tokio::task::yield_now().await;
        reader.handle_message(Message::RequestDisable).await;
        reader.handle_message(Message::RequestEnable).await
    });

    assert!(reader.is_enabled().await);
    assert_eq!(HtmlTestHelper::count_tags(&page, "b"), 18);
    assert_each_paragraph_emphasised_once(&page);
}

#[tokio::test]
async fn test_reprocess_during_pass_is_queued() {
    let reader = reader(&paragraphs(6), TestConfigBuilder::new().with_batch_size(1).build());
    let page = reader.page().clone();

    let (summary, response) = tokio::join!(reader.on_load(), async {
        tokio::task::yield_now().await;
        reader.handle_message(Message::RequestReprocess).await
    });

    // 排队的请求由正在进行的处理消化，自身不处理任何元素
    match response {
        Response::Pass(queued) => assert_eq!(queued.processed, 0),
        other => panic!("unexpected response {:?}", other),
    }
    assert!(summary.expect("enabled at load").processed >= 6);
    assert_eq!(HtmlTestHelper::count_tags(&page, "b"), 18);
    assert_each_paragraph_emphasised_once(&page);
}

#[tokio::test]
async fn test_mutations_during_pass_are_queued() {
    let reader = reader(&paragraphs(6), TestConfigBuilder::new().with_batch_size(1).build());
    let page = reader.page().clone();

    let (summary, queued) = tokio::join!(reader.on_load(), async {
        tokio::task::yield_now().await;
        let p = page.create_element("p");
        page.append_child(&p, &page.create_text("alpha beta gamma"));
        page.append_child(&page.body(), &p);
        reader
            .handle_mutations(MutationBatch {
                targets: vec![p],
                removed: vec![],
            })
            .await
    });

    assert_eq!(queued.expect("enabled").processed, 0);
    assert_eq!(summary.expect("enabled at load").processed, 7);
    assert_eq!(HtmlTestHelper::count_tags(&page, "b"), 21);
    assert_each_paragraph_emphasised_once(&page);
}
