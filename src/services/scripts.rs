//! In-page extraction scripts
//!
//! Each script is a `() => {...}` function evaluated in the page; the returned
//! object is what the strategies interpret.

/// Manufacturer, description, stock and the first six price breaks of a product page
pub const PRODUCT_DETAILS: &str = r#"() => {
    const text = (el) => (el && el.textContent ? el.textContent.trim() : '');

    const mfgLink = document.querySelector('a[href*="/brand-detail/"]');
    const manufacturer = mfgLink ? (text(mfgLink) || 'N/A') : 'N/A';

    let description = 'N/A';
    const metaDesc = document.querySelector('meta[name="description"]');
    if (metaDesc && metaDesc.getAttribute('content')) {
        description = metaDesc.getAttribute('content');
    } else {
        const h1 = document.querySelector('h1');
        if (h1 && text(h1)) description = text(h1);
    }

    let stock = 'N/A';
    const lines = (document.body ? document.body.innerText : '').split('\n');
    for (let i = 0; i < lines.length; i++) {
        if (!lines[i].includes('In-Stock')) continue;
        for (let j = 0; j <= 3 && i + j < lines.length; j++) {
            const match = lines[i + j].match(/([0-9][0-9,]*)/);
            if (match) { stock = match[1].replace(/,/g, ''); break; }
        }
        break;
    }

    const pricing = [];
    for (const table of document.querySelectorAll('table')) {
        const header = text(table.querySelector('tr'));
        if (!/qty/i.test(header) || !/unit price/i.test(header)) continue;
        const rows = Array.from(table.querySelectorAll('tr')).slice(1, 7);
        for (const row of rows) {
            const cells = Array.from(row.querySelectorAll('td')).map(text);
            if (cells.length >= 3) {
                pricing.push({ qty: cells[0], unit_price: cells[1], ext_price: cells[2] });
            }
        }
        if (pricing.length) break;
    }

    return { manufacturer, description, stock, pricing };
}"#;

/// First product listed on a search page, used to resolve an MPN
pub const FIRST_SEARCH_HIT: &str = r#"() => {
    const links = Array.from(document.querySelectorAll('a[href*="/product-detail/"]'));
    if (links.length === 0) {
        return { found: false, message: 'No product links found' };
    }
    const first = links.find((a) => a.textContent && a.textContent.trim()) || links[0];
    let manufacturer = '';
    const row = first.closest('tr');
    if (row) {
        const mfgLink = row.querySelector('a[href*="/brand-detail/"]');
        if (mfgLink) manufacturer = mfgLink.textContent.trim();
    }
    return {
        found: true,
        count: links.length,
        results: [{ mpn: (first.textContent || '').trim(), manufacturer, productUrl: first.href }]
    };
}"#;

/// Every distinct product on a search result page
pub const SEARCH_RESULTS: &str = r#"() => {
    const byCode = new Map();
    for (const link of document.querySelectorAll('a[href*="/product-detail/"]')) {
        const match = link.href.match(/(C\d+)\.html/);
        if (!match) continue;
        const code = match[1];
        const label = (link.textContent || '').trim();
        const existing = byCode.get(code);
        if (existing) {
            if (!existing.mpn && label) existing.mpn = label;
            continue;
        }
        const row = link.closest('tr') || link.parentElement;
        const mfgLink = row ? row.querySelector('a[href*="/brand-detail/"]') : null;
        const cells = row ? Array.from(row.querySelectorAll('td')).map((td) => td.innerText.trim()) : [];
        byCode.set(code, {
            lcsc_code: code,
            mpn: label,
            manufacturer: mfgLink ? mfgLink.textContent.trim() : '',
            description: cells.find((c) => c.length > 30) || '',
            url: link.href
        });
    }
    const products = Array.from(byCode.values());
    const body = document.body ? document.body.innerText : '';
    const noResults = products.length === 0 && /no (matching )?(results|products)|0 results/i.test(body);
    return { success: products.length > 0, products, noResults };
}"#;

/// Fill the quantity box on a product page
pub fn set_quantity(quantity: u32) -> String {
    format!(
        r#"() => {{
    const inputs = Array.from(document.querySelectorAll('input[type="text"]'));
    const qtyInput = inputs.find((inp) => inp.placeholder && (inp.placeholder.includes('Qty') || inp.placeholder.includes('Quantity')));
    if (!qtyInput) return {{ success: false, error: 'Quantity input not found' }};
    qtyInput.focus();
    qtyInput.value = '';
    qtyInput.dispatchEvent(new Event('input', {{ bubbles: true }}));
    qtyInput.value = '{quantity}';
    qtyInput.dispatchEvent(new Event('input', {{ bubbles: true }}));
    qtyInput.dispatchEvent(new Event('change', {{ bubbles: true }}));
    qtyInput.blur();
    return {{ success: true, value: qtyInput.value }};
}}"#
    )
}

pub const CLICK_ADD_TO_CART: &str = r#"() => {
    const buttons = Array.from(document.querySelectorAll('button'));
    const addButton = buttons.find((b) => b.textContent.includes('Add To Cart'));
    if (!addButton) return { success: false, error: 'Add To Cart button not found' };
    addButton.click();
    return { success: true, clicked: true };
}"#;

/// Line items and total of the cart page
pub const CART_CONTENTS: &str = r#"() => {
    const items = [];
    const seen = new Set();

    for (const link of document.querySelectorAll('a[href*="/product-detail/"]')) {
        const match = link.href.match(/(C\d+)\.html/) || link.href.match(/(C\d+)/);
        if (!match) continue;
        const lcscCode = match[1];
        if (seen.has(lcscCode) || (link.textContent || '').trim() === 'View') continue;
        seen.add(lcscCode);

        let container = link.parentElement;
        for (let depth = 0; container && depth < 15; depth++) {
            const hasQty = container.querySelectorAll('input[type="text"]').length > 0;
            const hasPrice = container.textContent.includes('$');
            if (hasQty && hasPrice) break;
            container = container.parentElement;
        }
        if (!container) continue;

        const walker = document.createTreeWalker(container, NodeFilter.SHOW_TEXT);
        const texts = [];
        let node;
        while ((node = walker.nextNode())) {
            const t = node.textContent.trim();
            if (t) texts.push(t);
        }

        const codeAt = texts.indexOf(lcscCode);
        const mpn = codeAt >= 0 && /^[A-Z0-9][A-Z0-9\-]+$/.test(texts[codeAt + 1] || '') ? texts[codeAt + 1] : 'N/A';
        const mfgLink = container.querySelector('a[href*="/brand-detail/"]');

        let quantity = 'N/A';
        for (const input of container.querySelectorAll('input[type="text"]')) {
            if (/^\d+$/.test(input.value || '')) { quantity = input.value; break; }
        }

        const prices = [];
        for (const t of texts) {
            const found = t.match(/\$\d+\.\d{2,}/g);
            if (found) prices.push(...found);
        }

        items.push({
            lcscCode,
            mpn,
            manufacturer: mfgLink ? mfgLink.textContent.trim() : 'N/A',
            description: texts.find((t) => t.length > 30 && !t.includes('$')) || 'N/A',
            quantity,
            unitPrice: prices.length >= 2 ? prices[0] : 'N/A',
            extPrice: prices.length >= 2 ? prices[1] : (prices[0] || 'N/A')
        });
    }

    const body = document.body ? document.body.innerText : '';
    const totalMatch = body.match(/Total[:\s]*\$([\d,]+\.\d{2})/i);
    const cartTotal = totalMatch ? '$' + totalMatch[1] : 'N/A';
    const rendered = document.readyState === 'complete' && (items.length > 0 || /cart/i.test(body));

    return { rendered, items, cartTotal, totalItems: items.length };
}"#;
