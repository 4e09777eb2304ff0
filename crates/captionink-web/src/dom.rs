//! Browser plumbing: file picking, file reads, downloads and blitting.

use captionink_core::ImageFile;
use captionink_core::engine::Frame;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, Document, HtmlAnchorElement, HtmlInputElement};

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document"))
}

/// Open a hidden `<input type="file">` and call `on_file` with the first pick.
pub fn open_file_picker(accept: &str, on_file: impl FnOnce(web_sys::File) + 'static) -> Result<(), JsValue> {
    let document = document()?;
    let input = document.create_element("input")?.dyn_into::<HtmlInputElement>()?;

    input.set_type("file");
    input.set_accept(accept);
    input.style().set_property("display", "none")?;

    let input_clone = input.clone();
    let onchange = Closure::once(Box::new(move |_event: web_sys::Event| {
        if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
            on_file(file);
        } else {
            log::debug!("File picker closed without a file");
        }
        input_clone.remove();
    }) as Box<dyn FnOnce(_)>);

    input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
    onchange.forget();

    document
        .body()
        .ok_or_else(|| JsValue::from_str("No body"))?
        .append_child(&input)?;
    input.click();
    Ok(())
}

/// Read a picked file into memory.
pub async fn read_file(file: &web_sys::File) -> Result<ImageFile, JsValue> {
    let array_buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer()).await?;
    let bytes = js_sys::Uint8Array::new(&array_buffer).to_vec();
    let mut image_file = ImageFile::new(file.name(), bytes);
    let mime = file.type_();
    if !mime.is_empty() {
        image_file = image_file.with_mime_type(mime);
    }
    Ok(image_file)
}

/// Offer `data` as a download named `filename`.
pub fn download_binary_file(filename: &str, data: &[u8], mime_type: &str) -> Result<(), JsValue> {
    let document = document()?;

    let uint8_array = js_sys::Uint8Array::from(data);
    let blob_parts = js_sys::Array::new();
    blob_parts.push(&uint8_array);

    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime_type);

    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&blob_parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let a = document.create_element("a")?.dyn_into::<HtmlAnchorElement>()?;
    a.set_href(&url);
    a.set_download(filename);
    a.click();

    web_sys::Url::revoke_object_url(&url).ok();
    Ok(())
}

/// Copy a rendered frame onto the canvas.
pub fn blit(context: &CanvasRenderingContext2d, frame: &Frame) -> Result<(), JsValue> {
    let data = web_sys::ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(frame.as_raw().as_slice()),
        frame.width(),
        frame.height(),
    )?;
    context.put_image_data(&data, 0.0, 0.0)
}
