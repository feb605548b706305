//! [`Dom`] over an eoka CDP page.
//!
//! Matched nodes are tagged with a `data-compass-ref` attribute so a handle can
//! be addressed again by CSS. A node that lost its tag (re-rendered or removed)
//! reports as stale.

use super::{Dom, ElementHandle, Locator};
use crate::session::Session;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const REF_ATTR: &str = "data-compass-ref";

/// Resolves a locator and snapshots every match.
const QUERY_JS: &str = r#"
(() => {
    const arg = __compass_arg;
    let nodes = [];
    if (arg.kind === 'css') {
        nodes = Array.from(document.querySelectorAll(arg.expr));
    } else {
        const snap = document.evaluate(arg.expr, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        for (let i = 0; i < snap.snapshotLength; i++) nodes.push(snap.snapshotItem(i));
    }
    if (!window.__compassSeq) window.__compassSeq = 0;
    if (!window.__compassEpoch) window.__compassEpoch = Date.now().toString(36);

    const out = [];
    for (const el of nodes) {
        if (!el || el.nodeType !== 1) continue;
        let id = el.getAttribute('data-compass-ref');
        if (!id) {
            id = window.__compassEpoch + '-' + (++window.__compassSeq);
            el.setAttribute('data-compass-ref', id);
        }
        const rect = el.getBoundingClientRect();
        const style = getComputedStyle(el);
        const visible = rect.width > 0 && rect.height > 0
            && style.display !== 'none'
            && style.visibility !== 'hidden'
            && parseFloat(style.opacity || '1') > 0;
        const cls = (el.getAttribute('class') || '').toLowerCase();
        const ariaDisabled = (el.getAttribute('aria-disabled') || '').toLowerCase();
        const enabled = !el.disabled && ariaDisabled !== 'true' && !/\bdisabled\b/.test(cls);
        const text = (el.innerText || el.textContent || '').trim().replace(/\s+/g, ' ');
        out.push({ id, text, visible, enabled });
    }
    return JSON.stringify(out);
})()
"#;

#[derive(Deserialize)]
struct RawHandle {
    id: String,
    text: String,
    visible: bool,
    enabled: bool,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    stale: bool,
    #[serde(default)]
    value: Value,
}

fn ref_selector(element: &ElementHandle) -> String {
    format!("[{}=\"{}\"]", REF_ATTR, element.id)
}

fn locator_arg(locator: &Locator) -> Result<String> {
    Ok(serde_json::to_string(&serde_json::json!({
        "kind": locator.kind(),
        "expr": locator.expr(),
    }))?)
}

impl Session {
    /// Run `body` with `el` bound to the handle's node; `body` may `return` a value.
    async fn on_element(&self, element: &ElementHandle, body: &str) -> Result<Value> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return JSON.stringify({{ stale: true }});
                const value = (() => {{ {body} }})();
                return JSON.stringify({{ value: value === undefined ? null : value }});
            }})()"#,
            sel = serde_json::to_string(&ref_selector(element))?,
            body = body,
        );
        let json_str: String = self.page().evaluate(&js).await?;
        let reply: Reply = serde_json::from_str(&json_str)?;
        if reply.stale {
            return Err(Error::StaleElement(format!("ref {}", element.id)));
        }
        Ok(reply.value)
    }
}

#[async_trait(?Send)]
impl Dom for Session {
    async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let js = QUERY_JS.replace("__compass_arg", &locator_arg(locator)?);
        let json_str: String = self.page().evaluate(&js).await?;
        let raw: Vec<RawHandle> = serde_json::from_str(&json_str)?;
        Ok(raw
            .into_iter()
            .map(|r| ElementHandle {
                id: r.id,
                text: r.text,
                visible: r.visible,
                enabled: r.enabled,
            })
            .collect())
    }

    async fn child_text(
        &self,
        element: &ElementHandle,
        locator: &Locator,
    ) -> Result<Option<String>> {
        let body = format!(
            r#"const arg = {arg};
            let child = null;
            if (arg.kind === 'css') {{
                child = el.querySelector(arg.expr);
            }} else {{
                child = document.evaluate(arg.expr, el, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
            }}
            return child ? (child.innerText || child.textContent || '').trim() : null;"#,
            arg = locator_arg(locator)?,
        );
        let value = self.on_element(element, &body).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(element, "el.scrollIntoView({block:'center'}); return true;")
            .await?;
        match self.page().click(&ref_selector(element)).await {
            Ok(()) => Ok(()),
            Err(::eoka::Error::ElementNotFound(_)) => {
                Err(Error::StaleElement(format!("ref {}", element.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        // Native setter so framework-controlled inputs see the change.
        self.on_element(
            element,
            r#"el.focus();
            const proto = Object.getPrototypeOf(el);
            const desc = Object.getOwnPropertyDescriptor(proto, 'value');
            if (desc && desc.set) { desc.set.call(el, ''); } else { el.value = ''; }
            el.dispatchEvent(new Event('input', { bubbles: true }));
            el.dispatchEvent(new Event('change', { bubbles: true }));
            return true;"#,
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.on_element(
            element,
            "el.focus(); if (el.setSelectionRange && typeof el.value === 'string') \
             { try { el.setSelectionRange(el.value.length, el.value.length); } catch (e) {} } \
             return true;",
        )
        .await?;
        self.page().type_text(text).await?;
        Ok(())
    }

    async fn value(&self, element: &ElementHandle) -> Result<String> {
        let value = self
            .on_element(element, "return typeof el.value === 'string' ? el.value : '';")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(element, "el.scrollIntoView({block:'center'}); return true;")
            .await?;
        Ok(())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let body = format!("return el.getAttribute({});", serde_json::to_string(name)?);
        let value = self.on_element(element, &body).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.page().goto(url).await?;
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.page().url().await?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page().screenshot().await?)
    }
}
