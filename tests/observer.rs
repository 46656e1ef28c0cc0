//! 变更观察与引擎联动测试

use std::time::Duration;

use smartreader::engine::ChangeObserver;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{reader, HtmlTestHelper, TestConfigBuilder};

#[tokio::test(start_paused = true)]
async fn test_rapid_mutations_coalesce_into_one_batch() {
    let page = HtmlTestHelper::page("<div id=root></div>");
    let root = HtmlTestHelper::element(&page, "div", 0);
    let (mut observer, _handle) =
        ChangeObserver::observe(&page, &root, Duration::from_millis(250));

    let producer = {
        let page = page.clone();
        let root = root.clone();
        async move {
            for i in 0..5 {
                let p = page.create_element("p");
                page.append_child(&p, &page.create_text(&format!("item {}", i)));
                page.append_child(&root, &p);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    };

    let (batch, _) = tokio::join!(observer.next_batch(), producer);
    let batch = batch.expect("batch delivered");
    assert_eq!(batch.targets.len(), 5);

    // 静默之后没有新批次
    let next = tokio::time::timeout(Duration::from_secs(5), observer.next_batch()).await;
    assert!(next.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_no_batch_after_disconnect_mid_debounce() {
    let page = HtmlTestHelper::page("<div></div>");
    let root = page.body();
    let (mut observer, handle) =
        ChangeObserver::observe(&page, &root, Duration::from_millis(250));

    let disconnect = {
        let page = page.clone();
        let root = root.clone();
        async move {
            page.append_child(&root, &page.create_element("p"));
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.disconnect();
            // 断开后的修改不会被投递
            page.append_child(&root, &page.create_element("p"));
        }
    };

    let (batch, _) = tokio::join!(observer.next_batch(), disconnect);
    assert!(batch.is_none());
    assert!(observer.next_batch().await.is_none());
    assert_eq!(page.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_inserted_content_is_processed_and_loop_settles() {
    let config = TestConfigBuilder::new().with_debounce_ms(100).build();
    let reader = reader("<main><p>existing text</p></main>", config);
    reader.on_load().await.expect("enabled by default");

    let (observer, handle) = reader.observe();
    let page = reader.page().clone();
    let main = HtmlTestHelper::element(&page, "main", 0);

    let script = async {
        let p = page.create_element("p");
        page.append_child(&p, &page.create_text("dynamic content"));
        page.append_child(&main, &p);
        // 足够让批次和引擎自身写入引起的批次都处理完
        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.disconnect();
    };

    tokio::join!(reader.watch(observer), script);

    let dynamic = HtmlTestHelper::element(&page, "p", 1);
    let html = String::from_utf8(
        smartreader::dom::serialize_document(&dynamic, "").unwrap(),
    )
    .unwrap();
    assert_eq!(html, "<b>dy</b>namic <b>co</b>ntent");
    assert_eq!(HtmlTestHelper::count_tags(&page, "b"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_character_data_change_is_reprocessed() {
    let config = TestConfigBuilder::new().with_debounce_ms(50).build();
    let reader = reader("<p>short</p><div>plain words</div>", config);
    reader.on_load().await;

    let page = reader.page().clone();
    let div = HtmlTestHelper::element(&page, "div", 0);
    // 替换为外部提供的纯文本内容
    page.set_text_content(&div, "replaced words");

    let (observer, handle) = reader.observe();
    let text = div.children.borrow()[0].clone();
    let script = async {
        page.set_text(&text, "edited words").unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.disconnect();
    };
    tokio::join!(reader.watch(observer), script);

    assert_eq!(
        HtmlTestHelper::inner_html(&page, "div"),
        "<b>ed</b>ited <b>wo</b>rds"
    );
}

#[tokio::test(start_paused = true)]
async fn test_edit_inside_marker_reprocesses_owner() {
    let config = TestConfigBuilder::new().with_debounce_ms(50).build();
    let reader = reader("<p>reading</p>", config);
    reader.on_load().await;

    let page = reader.page().clone();
    assert_eq!(HtmlTestHelper::inner_html(&page, "p"), "<b>re</b>ading");

    let (observer, handle) = reader.observe();
    let marker = HtmlTestHelper::element(&page, "b", 0);
    let inner = marker.children.borrow()[0].clone();
    let script = async {
        page.set_text(&inner, "thunder").unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.disconnect();
    };
    tokio::join!(reader.watch(observer), script);

    assert_eq!(HtmlTestHelper::inner_html(&page, "p"), "<b>th</b>underading");
}

#[tokio::test(start_paused = true)]
async fn test_child_added_to_marker_reprocesses_owner() {
    let config = TestConfigBuilder::new().with_debounce_ms(50).build();
    let reader = reader("<p>reading</p>", config);
    reader.on_load().await;

    let page = reader.page().clone();
    let (observer, handle) = reader.observe();
    let marker = HtmlTestHelper::element(&page, "b", 0);
    let script = async {
        page.append_child(&marker, &page.create_text("ad"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.disconnect();
    };
    tokio::join!(reader.watch(observer), script);

    assert_eq!(HtmlTestHelper::inner_html(&page, "p"), "<b>re</b>adading");
    assert_eq!(HtmlTestHelper::count_tags(&page, "b"), 1);
}
