//! Chat prompts for each step of a turn. Replies to end users are in Indonesian.

use hunian_domain::greeting::DayPart;
use hunian_providers::llm::ChatMessage;
use hunian_storage::session::{Message, Role};

pub const UPDATE_REQUEST_REPLY: &str = "Maaf, fitur ini masih pengembangan. Hubungi Admin atau kunjungi https://www.metaproperty.co.id";

const GUEST: &str = "guest";
const FORMAT_RULES: &str = "Modifikasi markdown: *bold* gunakan tanda bintang satu (bukan dua), \
bullet tetap, tanpa [teks](url). Jika ada link, tulis URL polos.";

/// `Human: ...` / `AI: ...` lines for the newest `turns` exchanges.
pub fn render_history(messages: &[Message], turns: usize) -> String {
	let start = messages.len().saturating_sub(turns.saturating_mul(2));

	messages[start..]
		.iter()
		.map(|message| {
			let role = match message.role {
				Role::Human => "Human",
				Role::Ai => "AI",
			};

			format!("{role}: {}", message.content)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

pub fn build_rewrite_messages(history: &str, question: &str) -> Vec<ChatMessage> {
	let system_prompt = "Ubahlah pertanyaan berikut menjadi satu kalimat mandiri. \
Manfaatkan HISTORY CHAT bila ada. Jangan menjawab; keluarkan hanya pertanyaannya. \
Tulis pertanyaan sebagai user dan ikuti gaya bahasa HISTORY CHAT.";

	vec![
		ChatMessage::system(system_prompt),
		ChatMessage::system(format!("HISTORY CHAT:\n{history}\n")),
		ChatMessage::user(question),
	]
}

pub fn build_classifier_messages(rewritten: &str) -> Vec<ChatMessage> {
	let system_prompt = "Klasifikasikan pertanyaan ke salah satu kategori:\n\
1. Pencarian/rekomendasi properti\n\
2. Update data properti (ubah harga/status/dll)\n\
3. Salam/sapaan\n\
4. Lainnya\n\
Jawab hanya angka kategori.";

	vec![ChatMessage::system(system_prompt), ChatMessage::user(rewritten)]
}

pub fn build_greeting_messages(
	day_part: DayPart,
	user_name: &str,
	history: &str,
	question: &str,
) -> Vec<ChatMessage> {
	let address = if user_name.trim().is_empty() || user_name == GUEST {
		"Pengguna adalah tamu; jangan sebut nama.".to_string()
	} else {
		format!("Panggil pengguna 'kk {user_name}'.")
	};
	let system_prompt = format!(
		"Anda adalah AI Asisten Meta Property. Sapa singkat dengan 'Selamat {day}'. \
Kenalkan diri singkat dan tanya kebutuhan. Hindari tanda seru (!). {address} \
Jangan ulang salam jika sudah ada di HISTORY CHAT.",
		day = day_part.as_str(),
	);

	vec![
		ChatMessage::system(system_prompt),
		ChatMessage::system(format!("HISTORY CHAT:\n{history}")),
		ChatMessage::user(question),
	]
}

/// Filter extraction. `previous_filter` is the JSON issued on the previous search turn.
pub fn build_filter_messages(previous_filter: Option<&str>, rewritten: &str) -> Vec<ChatMessage> {
	let system_prompt = format!(
		"Ubah kalimat pencarian properti menjadi JSON dengan kunci berikut, isi hanya jika ada nilainya: \
alamat, keyword (maks 2 token lokasi), harga_min, harga_max, kamar_tidur, lebar_bangunan, \
luas_bangunan, jumlah_tingkat, luas_tanah, kondisi (baru|kosong|full furnished|non furnished), \
tipe_listing (1=dijual, 2=disewa, 3=lelang), jenis_properti (1=rumah, 2=ruko, 3=tanah, \
4=apartemen, 5=gudang, 6=gedung), mata_angin. \
Harga dalam rupiah penuh: '1M' berarti 1000000000, '850 jt' berarti 850000000. \
Aturan harga: 'dibawah X' berarti harga_max=X; 'X sampai Y' berarti harga_min=X dan harga_max=Y; \
'sekitar X' berarti rentang 20% di bawah dan di atas X. \
Keyword tanpa negara, provinsi, kota, atau kata 'komplek'/'cluster'. \
Balas HANYA satu objek JSON valid.\n\
HISTORY JSON sebelumnya: {previous}",
		previous = previous_filter.unwrap_or("{}"),
	);

	vec![ChatMessage::system(system_prompt), ChatMessage::user(rewritten)]
}

/// Renders fused listing data. An empty `data` asks for an honest no-result reply.
pub fn build_answer_messages(question: &str, data: &str) -> Vec<ChatMessage> {
	let system_prompt = format!(
		"Anda adalah AI Asisten Meta Property. Jawab ringkas, padat, sopan. {FORMAT_RULES} \
Jangan tampilkan Google Maps kecuali diminta."
	);
	let data = if data.trim().is_empty() { "(kosong)" } else { data };
	let user_prompt = format!(
		"Jawab pertanyaan berikut berdasarkan Data Property.\n\
Pertanyaan: {question}\n\n\
Data Property:\n{data}\n\n\
Jika tidak ada data relevan, jawab jujur belum menemukan dan tawarkan ubah kriteria. \
Jangan mengarang listing yang tidak ada di Data Property."
	);

	vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)]
}

pub fn build_off_topic_messages(history: &str, question: &str) -> Vec<ChatMessage> {
	let system_prompt = format!(
		"Anda adalah AI Asisten Meta Property. Jawab sopan, relevan dengan konteks properti. \
Jika di luar konteks, sampaikan halus dan arahkan kembali. Hindari tanda seru (!). {FORMAT_RULES}"
	);

	vec![
		ChatMessage::system(system_prompt),
		ChatMessage::system(format!("HISTORY CHAT:\n{history}")),
		ChatMessage::user(question),
	]
}
